// Core matching workflow exports
pub mod candidates;
pub mod fanout;
pub mod policy;
pub mod sighting;

pub use candidates::{select_candidates, ActiveStatuses};
pub use fanout::{ComparisonFanOut, FanOutLimits, PairOutcome, PairResult};
pub use policy::{MatchPolicy, DEFAULT_CONFIDENCE_THRESHOLD};
pub use sighting::{
    decode_image_data, SightingError, SightingOptions, SightingOutcome, SightingProcessor,
};
