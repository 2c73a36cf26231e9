//! Click-through rate
//!
//! Historically two definitions of "click" and of "impression" have been in
//! use, so both are selectable through [`CtrDefinition`]:
//!
//! - clicks are either dedicated click events or implicit feedback of a
//!   configured type
//! - impressions are either distinct `(user, item)` pairs that were
//!   recommended, or every recommended slot including repeats
//!
//! The numerator is always the number of distinct clicked pairs. It is not
//! restricted to pairs that were recommended, so the rate can exceed 1 when
//! users click on items found elsewhere.

use crate::types::{Feedback, Recommendation, UserItemPair};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which feedback counts as a click
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "feedback_type")]
pub enum ClickSignal {
    /// `Feedback::Click` events
    ClickEvent,
    /// `Feedback::Implicit` events whose type equals the given name
    ImplicitType(String),
}

impl ClickSignal {
    fn matches(&self, feedback: &Feedback) -> bool {
        match (self, feedback) {
            (ClickSignal::ClickEvent, Feedback::Click { .. }) => true,
            (ClickSignal::ImplicitType(name), Feedback::Implicit { feedback_type, .. }) => {
                feedback_type == name
            }
            _ => false,
        }
    }
}

/// What the denominator counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impressions {
    /// Distinct recommended `(user, item)` pairs
    DistinctPairs,
    /// Every recommended slot, repeats included
    Slots,
}

/// Selected click and impression definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtrDefinition {
    pub clicks: ClickSignal,
    pub impressions: Impressions,
}

impl CtrDefinition {
    pub fn new(clicks: ClickSignal, impressions: Impressions) -> Self {
        Self { clicks, impressions }
    }
}

impl Default for CtrDefinition {
    fn default() -> Self {
        Self::new(ClickSignal::ClickEvent, Impressions::DistinctPairs)
    }
}

impl fmt::Display for CtrDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clicks = match &self.clicks {
            ClickSignal::ClickEvent => "click events".to_string(),
            ClickSignal::ImplicitType(name) => format!("implicit '{}'", name),
        };
        let impressions = match self.impressions {
            Impressions::DistinctPairs => "distinct pairs",
            Impressions::Slots => "slots",
        };
        write!(f, "{} / {}", clicks, impressions)
    }
}

/// Distinct clicked pairs divided by impressions; NaN when nothing was shown
pub fn ctr(recommendations: &[Recommendation], feedback: &[Feedback], definition: &CtrDefinition) -> f64 {
    let impressions = match definition.impressions {
        Impressions::DistinctPairs => recommendations
            .iter()
            .flat_map(|rec| rec.item_ids().map(move |item_id| UserItemPair::new(rec.user_id, item_id)))
            .collect::<HashSet<_>>()
            .len(),
        Impressions::Slots => recommendations.iter().map(|rec| rec.items.len()).sum(),
    };

    if impressions == 0 {
        return f64::NAN;
    }

    let clicks = feedback
        .iter()
        .filter(|fb| definition.clicks.matches(fb))
        .map(Feedback::pair)
        .collect::<HashSet<_>>()
        .len();

    clicks as f64 / impressions as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, RecommendedItem, UserId};
    use chrono::Utc;

    fn list(user_id: UserId, items: &[ItemId]) -> Recommendation {
        Recommendation::new(
            user_id,
            items.iter().map(|id| RecommendedItem::unscored(*id)).collect(),
            Utc::now(),
            0,
        )
    }

    #[test]
    fn test_empty_input_is_nan() {
        assert!(ctr(&[], &[], &CtrDefinition::default()).is_nan());
        assert!(ctr(&[list(1, &[])], &[], &CtrDefinition::default()).is_nan());
    }

    #[test]
    fn test_click_events_over_distinct_pairs() {
        let at = Utc::now();
        let recs = vec![list(1, &[3, 2, 4]), list(3, &[1, 5, 3, 9])];
        let feedback = vec![
            Feedback::click(3, 9, at),
            Feedback::click(1, 3, at),
            Feedback::click(3, 1, at),
        ];

        assert!((ctr(&recs, &feedback, &CtrDefinition::default()) - 0.42857).abs() < 0.001);
    }

    #[test]
    fn test_other_feedback_is_not_a_click() {
        let at = Utc::now();
        let recs = vec![list(1, &[3, 2, 4]), list(3, &[1, 5, 3, 9]), list(1, &[8, 7, 1])];
        let feedback = vec![
            Feedback::click(1, 3, at),
            Feedback::click(3, 1, at),
            Feedback::click(1, 7, at),
            Feedback::implicit(3, 9, at, "Test1", "1"),
            Feedback::explicit(1, 8, at, 5.0),
        ];

        assert!((ctr(&recs, &feedback, &CtrDefinition::default()) - 0.3).abs() < 0.001);
    }

    #[test]
    fn test_repeated_clicks_and_impressions() {
        let at = Utc::now();
        let recs = vec![list(1, &[3, 2]), list(1, &[3, 2])];
        let feedback = vec![Feedback::click(1, 3, at), Feedback::click(1, 3, at)];

        let distinct = ctr(&recs, &feedback, &CtrDefinition::default());
        assert!((distinct - 0.5).abs() < 1e-12);

        let slots = CtrDefinition::new(ClickSignal::ClickEvent, Impressions::Slots);
        assert!((ctr(&recs, &feedback, &slots) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_implicit_click_type() {
        let at = Utc::now();
        let recs = vec![list(1, &[3, 2, 4, 5])];
        let feedback = vec![
            Feedback::implicit(1, 3, at, "click", "1"),
            Feedback::implicit(1, 2, at, "view", "1"),
            Feedback::click(1, 4, at),
        ];

        let definition =
            CtrDefinition::new(ClickSignal::ImplicitType("click".to_string()), Impressions::DistinctPairs);
        assert!((ctr(&recs, &feedback, &definition) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_clicks_outside_recommendations_still_count() {
        let at = Utc::now();
        let recs = vec![list(1, &[3])];
        let feedback = vec![Feedback::click(1, 3, at), Feedback::click(1, 99, at)];

        assert!((ctr(&recs, &feedback, &CtrDefinition::default()) - 2.0).abs() < 1e-12);
    }
}
