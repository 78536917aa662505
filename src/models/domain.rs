use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a missing-person case
///
/// Stored as text in the `cases.status` column using the display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Active Search")]
    ActiveSearch,
    #[serde(rename = "High Priority")]
    HighPriority,
    #[serde(rename = "Closed")]
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::New => "New",
            CaseStatus::ActiveSearch => "Active Search",
            CaseStatus::HighPriority => "High Priority",
            CaseStatus::Closed => "Closed",
        }
    }

    /// Closed is the only terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Closed)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(CaseStatus::New),
            "Active Search" => Ok(CaseStatus::ActiveSearch),
            "High Priority" => Ok(CaseStatus::HighPriority),
            "Closed" => Ok(CaseStatus::Closed),
            other => Err(format!("unknown case status: {}", other)),
        }
    }
}

/// Review state of a potential match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Confirmed => "confirmed",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VerificationStatus::Pending),
            "confirmed" => Ok(VerificationStatus::Confirmed),
            "rejected" => Ok(VerificationStatus::Rejected),
            other => Err(format!("unknown verification status: {}", other)),
        }
    }
}

/// Case row as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: i64,
    #[serde(rename = "personId")]
    pub person_id: i64,
    pub status: CaseStatus,
    #[serde(rename = "reportedBy")]
    pub reported_by: Option<String>,
    #[serde(rename = "contactName")]
    pub contact_name: Option<String>,
    #[serde(rename = "contactRole")]
    pub contact_role: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Everything needed to open a case: person, first photo and case metadata
#[derive(Debug, Clone)]
pub struct NewCase {
    pub name: String,
    pub age: i32,
    pub description: String,
    pub last_seen_location: String,
    pub last_seen_date: String,
    pub image_url: String,
    pub status: CaseStatus,
    pub reported_by: Option<String>,
    pub contact_name: Option<String>,
    pub contact_role: Option<String>,
}

/// Contact block shown on a case card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseContact {
    pub name: Option<String>,
    pub role: Option<String>,
}

/// Flattened case + person + first photo, as listed to the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSummary {
    pub id: i64,
    pub name: String,
    pub age: i32,
    #[serde(rename = "lastSeenLocation")]
    pub last_seen_location: String,
    #[serde(rename = "lastSeenDate")]
    pub last_seen_date: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub status: CaseStatus,
    pub description: String,
    pub contact: CaseContact,
    #[serde(rename = "reportedBy")]
    pub reported_by: Option<String>,
}

/// A new, unverified observation of a possibly missing person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sighting {
    pub id: i64,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Sighting fields supplied at intake, before an id is assigned
#[derive(Debug, Clone)]
pub struct NewSighting {
    pub image_url: String,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// One photo joined to the status of one of its person's cases
///
/// A photo whose person has several cases yields several rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoCaseRow {
    pub photo_id: i64,
    pub image_url: String,
    pub case_status: CaseStatus,
}

/// A photo eligible for comparison against a sighting
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidatePhoto {
    #[serde(rename = "photoId")]
    pub photo_id: i64,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// A comparison result that passed the confidence threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedMatch {
    #[serde(rename = "sightingId")]
    pub sighting_id: i64,
    #[serde(rename = "photoId")]
    pub photo_id: i64,
    pub confidence: f64,
}

/// Persisted pairing between a sighting and a candidate photo awaiting review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialMatch {
    pub id: i64,
    #[serde(rename = "sightingId")]
    pub sighting_id: i64,
    #[serde(rename = "photoId")]
    pub photo_id: i64,
    #[serde(rename = "confidenceScore")]
    pub confidence_score: f64,
    #[serde(rename = "verificationStatus")]
    pub verification_status: VerificationStatus,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Reporter details filed against a case, with the case card embedded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    #[serde(rename = "caseId")]
    pub case_id: i64,
    #[serde(rename = "reporterName")]
    pub reporter_name: String,
    #[serde(rename = "reporterRelation")]
    pub reporter_relation: String,
    #[serde(rename = "reporterWhatsapp")]
    pub reporter_whatsapp: Option<String>,
    #[serde(rename = "reporterAddress")]
    pub reporter_address: Option<String>,
    #[serde(rename = "reporterContact")]
    pub reporter_contact: Option<String>,
    #[serde(rename = "reporterEmail")]
    pub reporter_email: Option<String>,
    #[serde(rename = "missingPersonIdentification")]
    pub missing_person_identification: Option<String>,
    #[serde(rename = "missingPersonSocialMedia")]
    pub missing_person_social_media: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "case")]
    pub case: Option<CaseSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_status_round_trips_labels() {
        for status in [
            CaseStatus::New,
            CaseStatus::ActiveSearch,
            CaseStatus::HighPriority,
            CaseStatus::Closed,
        ] {
            assert_eq!(status.as_str().parse::<CaseStatus>().unwrap(), status);
        }
        assert!("closed".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn test_case_status_serializes_as_label() {
        let json = serde_json::to_string(&CaseStatus::ActiveSearch).unwrap();
        assert_eq!(json, "\"Active Search\"");
    }

    #[test]
    fn test_only_closed_is_terminal() {
        assert!(CaseStatus::Closed.is_terminal());
        assert!(!CaseStatus::New.is_terminal());
        assert!(!CaseStatus::HighPriority.is_terminal());
    }
}
