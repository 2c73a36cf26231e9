//! Stock strategies for splitting users between tracked systems
//!
//! An [`Assigner`] maps a user id to the identity of the tracker that will
//! serve that user. Any closure works; the constructors below cover the
//! common A/B splits.

use crate::error::{RecsysError, Result};
use crate::types::{SystemId, UserId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Picks the tracker that serves a user
pub type Assigner = Arc<dyn Fn(UserId) -> SystemId + Send + Sync>;

fn non_empty(systems: Vec<SystemId>) -> Result<Vec<SystemId>> {
    if systems.is_empty() {
        return Err(RecsysError::InvalidConfig(
            "assignment needs at least one system".to_string(),
        ));
    }
    Ok(systems)
}

/// `systems[user_id mod n]`; a stable split where a user always lands on
/// the same system
pub fn modulo(systems: Vec<SystemId>) -> Result<Assigner> {
    let systems = non_empty(systems)?;
    let n = systems.len() as i64;
    let assigner: Assigner =
        Arc::new(move |user_id: UserId| systems[user_id.rem_euclid(n) as usize].clone());
    Ok(assigner)
}

/// Cycles through `systems` in call order, regardless of the user
pub fn round_robin(systems: Vec<SystemId>) -> Result<Assigner> {
    let systems = non_empty(systems)?;
    let next = AtomicUsize::new(0);
    let assigner: Assigner = Arc::new(move |_user_id: UserId| {
        let slot = next.fetch_add(1, Ordering::Relaxed) % systems.len();
        systems[slot].clone()
    });
    Ok(assigner)
}

/// Uniformly random choice from a seeded generator, reproducible for a
/// fixed seed and call order
pub fn seeded_random(systems: Vec<SystemId>, seed: u64) -> Result<Assigner> {
    let systems = non_empty(systems)?;
    let rng = Mutex::new(StdRng::seed_from_u64(seed));
    let assigner: Assigner = Arc::new(move |_user_id: UserId| {
        let slot = rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..systems.len());
        systems[slot].clone()
    });
    Ok(assigner)
}
