//! Database row types mapping directly to SQLite rows, distinct from the
//! folio-types API models. Array- and map-valued fields (technologies,
//! skills, social_links) are stored as JSON-encoded text and decoded at
//! the controller boundary.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ProjectRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    pub technologies: Option<String>,
    pub featured: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Insert/update shape for a project; ids and timestamps are owned by SQLite.
pub struct ProjectRecord {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    pub technologies: String,
    pub featured: i64,
}

pub struct HomepageRow {
    pub id: i64,
    pub hero_title: Option<String>,
    pub hero_subtitle: Option<String>,
    pub about_text: Option<String>,
    pub skills: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub social_links: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct HomepageRecord {
    pub hero_title: Option<String>,
    pub hero_subtitle: Option<String>,
    pub about_text: Option<String>,
    pub skills: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub social_links: String,
}

pub struct ImageRow {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: i64,
    pub path: String,
    pub created_at: String,
}
