//! Serving latency statistics over recorded response times

use crate::types::Recommendation;

/// Arithmetic mean of response times in milliseconds; NaN for no lists
pub fn mean_response_time(recommendations: &[Recommendation]) -> f64 {
    if recommendations.is_empty() {
        return f64::NAN;
    }
    let total: f64 = recommendations
        .iter()
        .map(|rec| rec.response_time_ms as f64)
        .sum();
    total / recommendations.len() as f64
}

/// Median of response times in milliseconds; NaN for no lists
///
/// An even count averages the two middle values.
pub fn median_response_time(recommendations: &[Recommendation]) -> f64 {
    let mut times: Vec<u64> = recommendations.iter().map(|rec| rec.response_time_ms).collect();
    if times.is_empty() {
        return f64::NAN;
    }
    times.sort_unstable();

    let mid = times.len() / 2;
    if times.len() % 2 == 0 {
        (times[mid - 1] as f64 + times[mid] as f64) / 2.0
    } else {
        times[mid] as f64
    }
}
