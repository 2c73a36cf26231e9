//! Registry routing, lifecycle and feedback dump

mod common;

use common::{at, items, ToyRecommender};
use recsys_tracker_core::{
    assignment, storage, Feedback, ParamValue, Recommender, RecsysError,
    SystemId, SystemRegistry, User,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn ab_registry() -> (SystemRegistry, SystemId, SystemId) {
    let registry = SystemRegistry::new();
    let svd = registry
        .add_system(Arc::new(ToyRecommender::new("SVD")))
        .expect("fresh registry")
        .system_id();
    let uib = registry
        .add_system(Arc::new(ToyRecommender::new("UIB")))
        .expect("fresh registry")
        .system_id();
    registry.set_assigner(assignment::modulo(vec![svd.clone(), uib.clone()]).expect("two systems"));
    (registry, svd, uib)
}

#[test]
fn test_parity_split_serves_through_assigned_tracker() {
    let (registry, svd, uib) = ab_registry();

    assert_eq!(registry.register_user(10).expect("assigner set"), svd);
    assert_eq!(registry.register_user(11).expect("assigner set"), uib);

    let tracker = registry.tracker(&uib).expect("registered");
    tracker
        .get_recommendation(&User::new(11), &items(&[1, 2, 3]), Some(2))
        .expect("toy recommender never fails");

    assert_eq!(tracker.recommendation_count(), 1);
    assert_eq!(
        registry.tracker(&svd).expect("registered").recommendation_count(),
        0
    );
}

#[test]
fn test_concurrent_registration() {
    let (registry, svd, uib) = ab_registry();
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for n in 0..250 {
                    registry.register_user(t * 1000 + n).expect("assigner set");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("registration thread panicked");
    }

    assert_eq!(registry.serving_users_count(&svd).expect("registered"), 500);
    assert_eq!(registry.serving_users_count(&uib).expect("registered"), 500);

    // Registering twice does not double count.
    registry.register_user(0).expect("assigner set");
    assert_eq!(registry.serving_users_count(&svd).expect("registered"), 500);
}

#[test]
fn test_assigner_naming_unknown_tracker() {
    let registry = SystemRegistry::with_assigner(
        assignment::round_robin(vec![SystemId::new("ghost", "0")]).expect("one system"),
    );
    let err = registry.register_user(1).unwrap_err();
    assert!(matches!(err, RecsysError::TrackerNotFound(_)));
}

#[test]
fn test_managed_recommender_through_registry() {
    let (registry, svd, _) = ab_registry();
    let system = registry.recommender(&svd).expect("registered");

    system
        .set_param("Offset", ParamValue::Float(1.5))
        .expect("known parameter");
    assert_eq!(system.param("Offset").expect("known parameter"), ParamValue::Float(1.5));
    assert!(matches!(
        system.param("NumIter"),
        Err(RecsysError::UnknownParameter(_))
    ));
    assert!(matches!(
        system.set_param("Offset", ParamValue::Bool(true)),
        Err(RecsysError::InvalidParameter { .. })
    ));

    system.train().expect("toy training succeeds");

    // The tracker serves the retuned model.
    let pref = registry
        .tracker(&svd)
        .expect("registered")
        .get_expected_preference(&User::new(0), &items(&[2])[0])
        .expect("known item");
    assert_eq!(pref, 3.5);

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let model = dir.path().join("svd.model");
    system.save_model(&model).expect("Failed to save model");
    system.set_param("Offset", ParamValue::Float(0.0)).expect("known parameter");
    system.load_model(&model).expect("Failed to load model");
    assert_eq!(system.param("Offset").expect("known parameter"), ParamValue::Float(1.5));
}

#[test]
fn test_feedback_dump_deduplicates_across_trackers() {
    let (registry, svd, uib) = ab_registry();
    let shared = Feedback::explicit(4, 7, at(0), 4.0);

    for id in [&svd, &uib] {
        let tracker = registry.tracker(id).expect("registered");
        tracker
            .handle_feedback(&shared)
            .expect("toy recommender accepts feedback");
    }
    registry
        .tracker(&uib)
        .expect("registered")
        .handle_feedback(&Feedback::implicit(5, 7, at(3), "watched", "0.8"))
        .expect("toy recommender accepts feedback");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("feedback.txt");
    registry.save_feedback(&path).expect("Failed to save feedback");

    let loaded = storage::load_feedback(&path).expect("Failed to load feedback");
    assert_eq!(loaded.len(), 2);
    let pairs: HashSet<_> = loaded.iter().map(Feedback::pair).collect();
    assert_eq!(pairs.len(), 2);
    assert_eq!(loaded, registry.all_feedback());
}

#[test]
fn test_remove_system_parts() {
    let (registry, svd, uib) = ab_registry();
    registry.remove_tracker(&svd).expect("registered");
    registry.remove_recommender(&svd).expect("registered");

    let remaining: Vec<_> = registry.trackers().into_iter().map(|(id, _)| id).collect();
    assert_eq!(remaining, vec![uib.clone()]);
    assert_eq!(registry.recommenders().len(), 1);

    // Users routed to the removed tracker now fail loudly.
    assert!(registry.register_user(2).unwrap_err().is_not_found());
    assert!(registry.register_user(3).is_ok());
}
