//! System Registry
//!
//! Keeps the recommenders and trackers of a running service, and which
//! users each tracker is currently serving. An explicit registry instance
//! is passed to whatever hosts the serving endpoint.
//!
//! # Key Features
//!
//! - **Identity keyed**: systems and trackers are keyed by [`SystemId`] (name + version)
//! - **Snapshot reads**: listings clone out of the maps and never hold a lock afterwards
//! - **User assignment**: an injected [`Assigner`] routes new users to trackers
//! - **Per-tracker locking**: serving sets have their own locks, so users of different trackers never contend
//! - **Feedback dump**: every tracker's feedback, de-duplicated, written in the text log format

use crate::error::{RecsysError, Result};
use crate::recommender::{ManagedRecommender, Recommender};
use crate::storage;
use crate::tracking::assignment::Assigner;
use crate::tracking::tracker::Tracker;
use crate::types::{Feedback, ItemId, SystemId, UserId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

type ServingSet = Arc<Mutex<HashSet<UserId>>>;

/// Registry of recommender systems and their trackers
#[derive(Default)]
pub struct SystemRegistry {
    /// Map: identity -> recommender
    recommenders: RwLock<HashMap<SystemId, Arc<dyn ManagedRecommender>>>,

    /// Map: identity -> tracker
    trackers: RwLock<HashMap<SystemId, Arc<Tracker>>>,

    /// Map: tracker identity -> users it currently serves
    serving: RwLock<HashMap<SystemId, ServingSet>>,

    assigner: RwLock<Option<Assigner>>,
}

impl SystemRegistry {
    /// Create an empty registry without an assigner
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry routing users with `assigner`
    pub fn with_assigner(assigner: Assigner) -> Self {
        let registry = Self::new();
        registry.set_assigner(assigner);
        registry
    }

    /// Replace the function assigning users to trackers
    pub fn set_assigner(&self, assigner: Assigner) {
        *self.assigner.write().unwrap_or_else(PoisonError::into_inner) = Some(assigner);
    }

    /// Register a recommender under `id`
    pub fn add_recommender(&self, id: SystemId, system: Arc<dyn ManagedRecommender>) -> Result<()> {
        let mut recommenders = self.recommenders.write().unwrap_or_else(PoisonError::into_inner);
        if recommenders.contains_key(&id) {
            return Err(RecsysError::AlreadyExists(format!("recommender {}", id)));
        }
        info!("Registered recommender {}", id);
        recommenders.insert(id, system);
        Ok(())
    }

    /// Unregister a recommender, returning it
    pub fn remove_recommender(&self, id: &SystemId) -> Result<Arc<dyn ManagedRecommender>> {
        let removed = self
            .recommenders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .ok_or_else(|| RecsysError::SystemNotFound(id.to_string()))?;
        info!("Removed recommender {}", id);
        Ok(removed)
    }

    /// Look up a recommender
    pub fn recommender(&self, id: &SystemId) -> Result<Arc<dyn ManagedRecommender>> {
        self.recommenders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| RecsysError::SystemNotFound(id.to_string()))
    }

    /// Snapshot of all registered recommenders, ordered by identity
    pub fn recommenders(&self) -> Vec<(SystemId, Arc<dyn ManagedRecommender>)> {
        let mut all: Vec<_> = self
            .recommenders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, system)| (id.clone(), Arc::clone(system)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Register a tracker under `id` with an empty serving set
    pub fn add_tracker(&self, id: SystemId, tracker: Arc<Tracker>) -> Result<()> {
        let mut trackers = self.trackers.write().unwrap_or_else(PoisonError::into_inner);
        if trackers.contains_key(&id) {
            return Err(RecsysError::AlreadyExists(format!("tracker {}", id)));
        }
        self.serving
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), ServingSet::default());
        info!("Registered tracker {} ({})", id, tracker.tracker_name());
        trackers.insert(id, tracker);
        Ok(())
    }

    /// Unregister a tracker and forget the users it was serving
    pub fn remove_tracker(&self, id: &SystemId) -> Result<Arc<Tracker>> {
        let removed = self
            .trackers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .ok_or_else(|| RecsysError::TrackerNotFound(id.to_string()))?;
        self.serving
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        info!("Removed tracker {}", id);
        Ok(removed)
    }

    /// Look up a tracker
    pub fn tracker(&self, id: &SystemId) -> Result<Arc<Tracker>> {
        self.trackers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| RecsysError::TrackerNotFound(id.to_string()))
    }

    /// Snapshot of all registered trackers, ordered by identity
    pub fn trackers(&self) -> Vec<(SystemId, Arc<Tracker>)> {
        let mut all: Vec<_> = self
            .trackers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, tracker)| (id.clone(), Arc::clone(tracker)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Register a managed recommender and a tracker around it in one step
    ///
    /// Both are keyed by the system's own identity. Nothing is registered
    /// when either identity is already taken.
    pub fn add_system<R>(&self, system: Arc<R>) -> Result<Arc<Tracker>>
    where
        R: ManagedRecommender + 'static,
    {
        let id = system.system_id();
        let mut recommenders = self.recommenders.write().unwrap_or_else(PoisonError::into_inner);
        let mut trackers = self.trackers.write().unwrap_or_else(PoisonError::into_inner);

        if recommenders.contains_key(&id) || trackers.contains_key(&id) {
            return Err(RecsysError::AlreadyExists(format!("system {}", id)));
        }

        let served: Arc<dyn Recommender> = system.clone();
        let tracker = Arc::new(Tracker::new(served));

        recommenders.insert(id.clone(), system);
        trackers.insert(id.clone(), Arc::clone(&tracker));
        self.serving
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), ServingSet::default());

        info!("Registered system {} with tracker", id);
        Ok(tracker)
    }

    fn serving_set(&self, id: &SystemId) -> Result<ServingSet> {
        self.serving
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| RecsysError::TrackerNotFound(id.to_string()))
    }

    /// Assign a user to a tracker and mark them as served by it
    ///
    /// Fails with [`RecsysError::MissingAssigner`] before an assigner is set,
    /// and with [`RecsysError::TrackerNotFound`] when the assigner names an
    /// unknown tracker.
    pub fn register_user(&self, user_id: UserId) -> Result<SystemId> {
        let assigner = self
            .assigner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RecsysError::MissingAssigner)?;

        let id = assigner(user_id);
        let set = self.serving_set(&id)?;
        set.lock().unwrap_or_else(PoisonError::into_inner).insert(user_id);

        debug!("User {} assigned to {}", user_id, id);
        Ok(id)
    }

    /// Mark a user as no longer served by a tracker
    ///
    /// Returns whether the user was being served.
    pub fn deregister_user(&self, id: &SystemId, user_id: UserId) -> Result<bool> {
        let set = self.serving_set(id)?;
        let removed = set.lock().unwrap_or_else(PoisonError::into_inner).remove(&user_id);
        debug!("User {} released from {}", user_id, id);
        Ok(removed)
    }

    /// Number of users a tracker currently serves
    pub fn serving_users_count(&self, id: &SystemId) -> Result<usize> {
        let set = self.serving_set(id)?;
        let count = set.lock().unwrap_or_else(PoisonError::into_inner).len();
        Ok(count)
    }

    /// Feedback of every tracker, each distinct event once
    ///
    /// Trackers are visited in identity order and each log in insertion order.
    pub fn all_feedback(&self) -> Vec<Feedback> {
        let mut seen = HashSet::new();
        let mut all = Vec::new();

        for (_, tracker) in self.trackers() {
            for fb in tracker.feedback() {
                if seen.insert(FeedbackKey::of(&fb)) {
                    all.push(fb);
                }
            }
        }

        all
    }

    /// Write [`all_feedback`](Self::all_feedback) as a feedback log
    pub fn save_feedback(&self, path: &Path) -> Result<()> {
        storage::save_feedback(path, &self.all_feedback())
    }
}

/// Hashable identity of a feedback event
#[derive(PartialEq, Eq, Hash)]
enum FeedbackKey {
    Explicit(UserId, ItemId, DateTime<Utc>, u32),
    Implicit(UserId, ItemId, DateTime<Utc>, String, String),
    Click(UserId, ItemId, DateTime<Utc>),
}

impl FeedbackKey {
    fn of(feedback: &Feedback) -> Self {
        match feedback {
            Feedback::Explicit {
                user_id,
                item_id,
                at_time,
                preference,
            } => FeedbackKey::Explicit(*user_id, *item_id, *at_time, preference.to_bits()),
            Feedback::Implicit {
                user_id,
                item_id,
                at_time,
                feedback_type,
                value,
            } => FeedbackKey::Implicit(
                *user_id,
                *item_id,
                *at_time,
                feedback_type.clone(),
                value.clone(),
            ),
            Feedback::Click {
                user_id,
                item_id,
                at_time,
            } => FeedbackKey::Click(*user_id, *item_id, *at_time),
        }
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let recommenders: Vec<_> = self.recommenders().into_iter().map(|(id, _)| id).collect();
        let trackers: Vec<_> = self.trackers().into_iter().map(|(id, _)| id).collect();
        f.debug_struct("SystemRegistry")
            .field("recommenders", &recommenders)
            .field("trackers", &trackers)
            .finish()
    }
}
