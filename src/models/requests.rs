use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to report a new sighting
///
/// `image_data` is validated by the intake step rather than here, since a
/// missing image must be reported with its own message.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSightingRequest {
    #[serde(alias = "image_data", rename = "imageData", default)]
    pub image_data: Option<String>,
    #[serde(alias = "image_url", rename = "imageUrl", default)]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

/// Request to open a new case
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCaseRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 0, max = 150))]
    pub age: i32,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "last_seen_location", rename = "lastSeenLocation", default)]
    pub last_seen_location: String,
    #[serde(alias = "last_seen_date", rename = "lastSeenDate", default)]
    pub last_seen_date: String,
    #[serde(alias = "image_data", rename = "imageData", default)]
    pub image_data: Option<String>,
    #[serde(alias = "image_url", rename = "imageUrl", default)]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(alias = "reported_by", rename = "reportedBy", default)]
    pub reported_by: Option<String>,
    #[serde(alias = "contact_name", rename = "contactName", default)]
    pub contact_name: Option<String>,
    #[serde(alias = "contact_role", rename = "contactRole", default)]
    pub contact_role: Option<String>,
}
