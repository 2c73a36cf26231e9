//! Persisting tracker logs and reading them back

mod common;

use chrono::Utc;
use common::{at, items, ToyRecommender};
use recsys_tracker_core::{
    storage, Feedback, Recommendation, RecommendedItem, Recommender, RecsysError, Tracker, User,
};
use std::io::Cursor;
use std::sync::Arc;

#[test]
fn test_tracker_logs_survive_save_and_load() {
    let tracker = Tracker::new(Arc::new(ToyRecommender::new("SVDTracker")));
    for user in 1..=3 {
        tracker
            .get_recommendation(&User::new(user), &items(&[5, 6, 7, 8]), Some(3))
            .expect("toy recommender never fails");
    }
    tracker.add_feedback(vec![
        Feedback::explicit(1, 5, Utc::now(), 3.5),
        Feedback::implicit(2, 6, Utc::now(), "watched", "42"),
        Feedback::click(3, 7, Utc::now()),
    ]);

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let recs_path = dir.path().join("recommendations.txt");
    let fb_path = dir.path().join("feedback.txt");
    tracker.save_recommendations(&recs_path).expect("Failed to save");
    tracker.save_feedback(&fb_path).expect("Failed to save");

    let restored = Tracker::new(Arc::new(ToyRecommender::new("SVDTracker")));
    assert_eq!(restored.load_recommendations(&recs_path).expect("same name"), 3);
    assert_eq!(restored.load_feedback(&fb_path).expect("valid log"), 3);

    assert_eq!(restored.recommendations(), tracker.recommendations());
    assert_eq!(restored.feedback(), tracker.feedback());
}

#[test]
fn test_loading_foreign_log_is_rejected() {
    let tracker = Tracker::new(Arc::new(ToyRecommender::new("SVDTracker")));
    tracker
        .get_ranking(&User::new(1), &items(&[1]))
        .expect("toy recommender never fails");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("recommendations.txt");
    tracker.save_recommendations(&path).expect("Failed to save");

    let other = Tracker::new(Arc::new(ToyRecommender::new("UIBTracker")));
    match other.load_recommendations(&path) {
        Err(RecsysError::NameMismatch { expected, found }) => {
            assert_eq!(expected, "UIBTracker");
            assert_eq!(found, "SVDTracker");
        }
        other => panic!("expected name mismatch, got {:?}", other),
    }
    assert_eq!(other.recommendation_count(), 0);

    // A renamed tracker accepts it.
    let renamed = Tracker::new(Arc::new(ToyRecommender::new("UIB"))).with_name("SVDTracker");
    assert_eq!(renamed.load_recommendations(&path).expect("names match"), 1);
}

#[test]
fn test_in_memory_roundtrip_preserves_order_and_absent_predictions() {
    let recs = vec![
        Recommendation::new(
            2,
            vec![RecommendedItem::predicted(9, 0.1), RecommendedItem::unscored(4)],
            at(0),
            17,
        ),
        Recommendation::new(1, Vec::new(), at(1), 0),
        Recommendation::new(2, vec![RecommendedItem::predicted(3, -2.25)], at(2), 3),
    ];

    let mut buf = Vec::new();
    storage::write_recommendations(&mut buf, "Mixed", &recs).expect("Failed to write");
    let (name, read) = storage::read_recommendations(Cursor::new(buf)).expect("Failed to read");

    assert_eq!(name, "Mixed");
    assert_eq!(read, recs);
    assert_eq!(read[0].items[1].expected_preference, None);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let err = storage::load_feedback(&dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, RecsysError::Io(_)));
}
