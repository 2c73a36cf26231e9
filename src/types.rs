//! Core data types for the recommender tracking system
//!
//! This module defines the records the tracker produces and the metrics engine
//! consumes: users and items (identity only), feedback events, served
//! recommendation lists, and the `(user, item)` pair used as a map key
//! throughout evaluation. Records are immutable once they are appended to a
//! log; nothing in the crate mutates or deletes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a user
pub type UserId = i64;

/// Identifier of an item
pub type ItemId = i64;

/// A user as seen by the tracker: identity only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self { id }
    }
}

/// An item as seen by the tracker: identity only
///
/// Domain payload (titles, posters, genres) lives with the caller and is
/// looked up by id when a metric needs it, e.g. in a diversity function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
}

impl Item {
    pub fn new(id: ItemId) -> Self {
        Self { id }
    }
}

/// Identity of a recommender system: name plus version
///
/// Keys the registry maps; two versions of the same algorithm are distinct
/// systems with distinct trackers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId {
    pub name: String,
    pub version: String,
}

impl SystemId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A user's reaction to an item
///
/// Every variant carries the user, the item and the logical time of the
/// event. `at_time` is when the event happened, not when it was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "variant")]
pub enum Feedback {
    /// Rating the user stated directly
    Explicit {
        user_id: UserId,
        item_id: ItemId,
        at_time: DateTime<Utc>,
        preference: f32,
    },

    /// Signal inferred from behaviour (watch time, purchase, ...)
    Implicit {
        user_id: UserId,
        item_id: ItemId,
        at_time: DateTime<Utc>,
        /// Kind of signal, e.g. "watched" or "click"
        feedback_type: String,
        /// Opaque payload in its string form
        value: String,
    },

    /// Click on a recommended item
    Click {
        user_id: UserId,
        item_id: ItemId,
        at_time: DateTime<Utc>,
    },
}

impl Feedback {
    pub fn explicit(user_id: UserId, item_id: ItemId, at_time: DateTime<Utc>, preference: f32) -> Self {
        Feedback::Explicit {
            user_id,
            item_id,
            at_time,
            preference,
        }
    }

    pub fn implicit(
        user_id: UserId,
        item_id: ItemId,
        at_time: DateTime<Utc>,
        feedback_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Feedback::Implicit {
            user_id,
            item_id,
            at_time,
            feedback_type: feedback_type.into(),
            value: value.into(),
        }
    }

    pub fn click(user_id: UserId, item_id: ItemId, at_time: DateTime<Utc>) -> Self {
        Feedback::Click {
            user_id,
            item_id,
            at_time,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            Feedback::Explicit { user_id, .. }
            | Feedback::Implicit { user_id, .. }
            | Feedback::Click { user_id, .. } => *user_id,
        }
    }

    pub fn item_id(&self) -> ItemId {
        match self {
            Feedback::Explicit { item_id, .. }
            | Feedback::Implicit { item_id, .. }
            | Feedback::Click { item_id, .. } => *item_id,
        }
    }

    pub fn at_time(&self) -> DateTime<Utc> {
        match self {
            Feedback::Explicit { at_time, .. }
            | Feedback::Implicit { at_time, .. }
            | Feedback::Click { at_time, .. } => *at_time,
        }
    }

    /// The `(user, item)` pair this event refers to
    pub fn pair(&self) -> UserItemPair {
        UserItemPair::new(self.user_id(), self.item_id())
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Feedback::Explicit { .. })
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self, Feedback::Implicit { .. })
    }

    pub fn is_click(&self) -> bool {
        matches!(self, Feedback::Click { .. })
    }
}

/// One entry of a served list
///
/// `expected_preference` is `None` when the recommender made no prediction,
/// which is not the same as predicting 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendedItem {
    pub item: Item,
    pub expected_preference: Option<f32>,
}

impl RecommendedItem {
    pub fn new(item: Item, expected_preference: Option<f32>) -> Self {
        Self {
            item,
            expected_preference,
        }
    }

    /// Recommended item carrying a prediction
    pub fn predicted(item_id: ItemId, preference: f32) -> Self {
        Self::new(Item::new(item_id), Some(preference))
    }

    /// Recommended item without a prediction
    pub fn unscored(item_id: ItemId) -> Self {
        Self::new(Item::new(item_id), None)
    }
}

/// One served, ranked list for one user
///
/// `items[0]` is the best ranked entry. Created once per serving call and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user_id: UserId,
    pub items: Vec<RecommendedItem>,
    pub at_time: DateTime<Utc>,
    pub response_time_ms: u64,
}

impl Recommendation {
    pub fn new(
        user_id: UserId,
        items: Vec<RecommendedItem>,
        at_time: DateTime<Utc>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            user_id,
            items,
            at_time,
            response_time_ms,
        }
    }

    /// Item ids in rank order
    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().map(|r| r.item.id)
    }
}

/// A `(user, item)` key; equal iff both ids match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserItemPair {
    pub user_id: UserId,
    pub item_id: ItemId,
}

impl UserItemPair {
    pub fn new(user_id: UserId, item_id: ItemId) -> Self {
        Self { user_id, item_id }
    }
}

impl std::fmt::Display for UserItemPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.user_id, self.item_id)
    }
}

/// A resolved preference value for one pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserItemPreference {
    pub pair: UserItemPair,
    pub value: f32,
}

impl UserItemPreference {
    pub fn new(pair: UserItemPair, value: f32) -> Self {
        Self { pair, value }
    }
}
