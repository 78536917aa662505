//! FindTogether - missing-persons case backend
//!
//! This library holds the sighting matching workflow: a reported sighting is
//! compared against the photos of every open case and strong matches are
//! recorded for human review.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{ComparisonFanOut, FanOutLimits, MatchPolicy, SightingProcessor};
pub use crate::models::{AcceptedMatch, CaseStatus, CreateSightingRequest, CreateSightingResponse};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(MatchPolicy::default().threshold(), 0.8);
        assert!(CaseStatus::Closed.is_terminal());
    }
}
