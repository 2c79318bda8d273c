use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

// -- JWT Claims --

/// JWT claims shared between token issuance (auth routes) and the
/// authorization middleware. Canonical definition lives here in folio-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Lenient field coercion --

/// Deserialize a JSON array of strings, normalizing a missing or mistyped
/// value to an empty list instead of failing the request.
pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Deserialize a JSON object of string-to-string pairs, normalizing a
/// missing or mistyped value to an empty mapping.
pub fn lenient_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

// -- Users --

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword")]
    pub current_password: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
}

// -- Projects --

/// Body for both create and update; PUT replaces the full record.
#[derive(Debug, Deserialize)]
pub struct ProjectPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    pub technologies: Vec<String>,
    pub featured: bool,
    pub created_at: String,
    pub updated_at: String,
}

// -- Homepage --

#[derive(Debug, Deserialize)]
pub struct HomepagePayload {
    pub hero_title: Option<String>,
    pub hero_subtitle: Option<String>,
    pub about_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub skills: Vec<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_map")]
    pub social_links: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct HomepageResponse {
    pub id: i64,
    pub hero_title: Option<String>,
    pub hero_subtitle: Option<String>,
    pub about_text: Option<String>,
    pub skills: Vec<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub social_links: BTreeMap<String, String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub projects: i64,
    pub images: i64,
    pub users: i64,
}

// -- Images --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: i64,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: ImageResponse,
}

#[derive(Debug, Serialize)]
pub struct UploadBatchResponse {
    pub message: String,
    pub files: Vec<ImageResponse>,
}
