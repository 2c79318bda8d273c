use axum::{
    Extension, Json,
    extract::State,
};

use folio_db::models::{HomepageRecord, HomepageRow};
use folio_types::api::{Claims, HomepagePayload, HomepageResponse, StatsResponse};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

fn homepage_record(payload: HomepagePayload) -> Result<HomepageRecord, ApiError> {
    Ok(HomepageRecord {
        hero_title: payload.hero_title,
        hero_subtitle: payload.hero_subtitle,
        about_text: payload.about_text,
        skills: serde_json::to_string(&payload.skills)
            .map_err(|e| ApiError::Internal(e.into()))?,
        contact_email: payload.contact_email,
        contact_phone: payload.contact_phone,
        social_links: serde_json::to_string(&payload.social_links)
            .map_err(|e| ApiError::Internal(e.into()))?,
    })
}

fn homepage_response(row: HomepageRow) -> HomepageResponse {
    HomepageResponse {
        id: row.id,
        hero_title: row.hero_title,
        hero_subtitle: row.hero_subtitle,
        about_text: row.about_text,
        skills: row
            .skills
            .as_deref()
            .map(|s| serde_json::from_str(s).unwrap_or_default())
            .unwrap_or_default(),
        contact_email: row.contact_email,
        contact_phone: row.contact_phone,
        social_links: row
            .social_links
            .as_deref()
            .map(|s| serde_json::from_str(s).unwrap_or_default())
            .unwrap_or_default(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub async fn get_homepage(
    State(state): State<AppState>,
) -> Result<Json<HomepageResponse>, ApiError> {
    let st = state.clone();
    let row = blocking(move || st.db.get_homepage())
        .await?
        .ok_or(ApiError::NotFound("Homepage content"))?;
    Ok(Json(homepage_response(row)))
}

/// PUT /api/homepage — upsert against the singleton row: update the first
/// row by ascending id, or insert when the table is empty.
pub async fn update_homepage(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(payload): Json<HomepagePayload>,
) -> Result<Json<HomepageResponse>, ApiError> {
    let record = homepage_record(payload)?;

    let st = state.clone();
    let row = blocking(move || {
        match st.db.get_homepage()? {
            Some(existing) => {
                st.db.update_homepage(existing.id, &record)?;
            }
            None => {
                st.db.insert_homepage(&record)?;
            }
        }
        st.db.get_homepage()
    })
    .await?
    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("homepage row missing after upsert")))?;

    Ok(Json(homepage_response(row)))
}

/// GET /api/homepage/stats — dashboard counters.
pub async fn stats(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<StatsResponse>, ApiError> {
    let st = state.clone();
    let stats = blocking(move || {
        Ok(StatsResponse {
            projects: st.db.count_projects()?,
            images: st.db.count_images()?,
            users: st.db.count_users()?,
        })
    })
    .await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AppStateInner;
    use crate::storage::Storage;
    use folio_db::Database;
    use std::sync::Arc;

    async fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        let storage = Storage::new(dir.path().join("images")).await.unwrap();
        let state = Arc::new(AppStateInner {
            db,
            storage,
            jwt_secret: "test-secret".into(),
            dev_mode: true,
            max_upload_bytes: 1024,
        });
        (dir, state)
    }

    fn claims() -> Claims {
        Claims {
            sub: 1,
            username: "alice".into(),
            exp: 0,
        }
    }

    fn sample_payload() -> HomepagePayload {
        serde_json::from_str(
            r#"{"hero_title": "Hi", "skills": ["Rust"], "social_links": {"github": "https://github.com/me"}}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn upsert_inserts_when_table_is_empty() {
        let (_dir, state) = test_state().await;

        // Drop the seeded row so the upsert has to take the insert path
        state
            .db
            .with_conn_mut(|conn| {
                conn.execute_batch("DELETE FROM homepage")?;
                Ok(())
            })
            .unwrap();

        let Json(body) = update_homepage(
            State(state.clone()),
            Extension(claims()),
            Json(sample_payload()),
        )
        .await
        .unwrap();
        assert_eq!(body.hero_title.as_deref(), Some("Hi"));
        assert_eq!(body.skills, vec!["Rust"]);

        let Json(read) = get_homepage(State(state)).await.unwrap();
        assert_eq!(read.id, body.id);
        assert_eq!(read.skills, vec!["Rust"]);
        assert_eq!(
            read.social_links.get("github").map(String::as_str),
            Some("https://github.com/me")
        );
    }

    #[tokio::test]
    async fn upsert_updates_the_existing_row_in_place() {
        let (_dir, state) = test_state().await;

        let Json(first) = update_homepage(
            State(state.clone()),
            Extension(claims()),
            Json(sample_payload()),
        )
        .await
        .unwrap();

        let mut payload = sample_payload();
        payload.hero_title = Some("Hello again".into());
        let Json(second) =
            update_homepage(State(state), Extension(claims()), Json(payload))
                .await
                .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.hero_title.as_deref(), Some("Hello again"));
    }

    #[test]
    fn record_encodes_skills_and_social_links() {
        let payload: HomepagePayload = serde_json::from_str(
            r#"{"hero_title": "Hi", "skills": ["Rust"], "social_links": {"github": "https://github.com/me"}}"#,
        )
        .unwrap();
        let record = homepage_record(payload).unwrap();
        assert_eq!(record.skills, r#"["Rust"]"#);
        assert_eq!(record.social_links, r#"{"github":"https://github.com/me"}"#);
    }

    #[test]
    fn response_round_trips_encoded_fields() {
        let row = HomepageRow {
            id: 1,
            hero_title: Some("Hi".into()),
            hero_subtitle: None,
            about_text: None,
            skills: Some(r#"["Rust","SQL"]"#.into()),
            contact_email: None,
            contact_phone: None,
            social_links: Some(r#"{"github":"https://github.com/me"}"#.into()),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let resp = homepage_response(row);
        assert_eq!(resp.skills, vec!["Rust", "SQL"]);
        assert_eq!(
            resp.social_links.get("github").map(String::as_str),
            Some("https://github.com/me")
        );
    }

    #[test]
    fn response_tolerates_missing_encoded_fields() {
        let row = HomepageRow {
            id: 1,
            hero_title: None,
            hero_subtitle: None,
            about_text: None,
            skills: None,
            contact_email: None,
            contact_phone: None,
            social_links: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let resp = homepage_response(row);
        assert!(resp.skills.is_empty());
        assert!(resp.social_links.is_empty());
    }
}
