use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single guest list entry. One record per invited party.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Site-wide feature flags. Singleton document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub photos_enabled: bool,
}

/// Entry returned by the photo listing: the web-format copy only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoListing {
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Reference to a freshly uploaded photo's web-format copy.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoUpload {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGuestRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGuestRequest {
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub photos_enabled: Option<bool>,
}
