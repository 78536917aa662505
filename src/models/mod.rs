// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AcceptedMatch, CandidatePhoto, Case, CaseContact, CaseStatus, CaseSummary, NewCase,
    NewSighting, PhotoCaseRow, PotentialMatch, Report, Sighting, VerificationStatus,
};
pub use requests::{CreateCaseRequest, CreateSightingRequest};
pub use responses::{
    CreateCaseResponse, CreateSightingResponse, ErrorResponse, HealthResponse,
    SightingMatchesResponse,
};
