use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use folio_db::models::{ProjectRecord, ProjectRow};
use folio_types::api::{Claims, MessageResponse, ProjectPayload, ProjectResponse};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

fn project_record(payload: ProjectPayload) -> Result<ProjectRecord, ApiError> {
    let title = payload.title.unwrap_or_default();
    if title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".into()));
    }

    Ok(ProjectRecord {
        title,
        description: payload.description,
        image_url: payload.image_url,
        project_url: payload.project_url,
        github_url: payload.github_url,
        technologies: serde_json::to_string(&payload.technologies)
            .map_err(|e| ApiError::Internal(e.into()))?,
        featured: payload.featured as i64,
    })
}

fn project_response(row: ProjectRow) -> ProjectResponse {
    ProjectResponse {
        id: row.id,
        title: row.title,
        description: row.description,
        image_url: row.image_url,
        project_url: row.project_url,
        github_url: row.github_url,
        technologies: row
            .technologies
            .as_deref()
            .map(|s| serde_json::from_str(s).unwrap_or_default())
            .unwrap_or_default(),
        featured: row.featured != 0,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let st = state.clone();
    let rows = blocking(move || st.db.list_projects()).await?;
    Ok(Json(rows.into_iter().map(project_response).collect()))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let st = state.clone();
    let row = blocking(move || st.db.get_project(id))
        .await?
        .ok_or(ApiError::NotFound("Project"))?;
    Ok(Json(project_response(row)))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(payload): Json<ProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let record = project_record(payload)?;

    let st = state.clone();
    let row = blocking(move || {
        let id = st.db.insert_project(&record)?;
        st.db.get_project(id)
    })
    .await?
    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("project row missing after insert")))?;

    Ok((StatusCode::CREATED, Json(project_response(row))))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(_claims): Extension<Claims>,
    Json(payload): Json<ProjectPayload>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let record = project_record(payload)?;

    let st = state.clone();
    let row = blocking(move || {
        if st.db.update_project(id, &record)? == 0 {
            return Ok(None);
        }
        st.db.get_project(id)
    })
    .await?
    .ok_or(ApiError::NotFound("Project"))?;

    Ok(Json(project_response(row)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let st = state.clone();
    if blocking(move || st.db.delete_project(id)).await? == 0 {
        return Err(ApiError::NotFound("Project"));
    }
    Ok(Json(MessageResponse {
        message: "Project deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_non_empty_title() {
        let payload: ProjectPayload = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            project_record(payload),
            Err(ApiError::Validation(_))
        ));

        let payload: ProjectPayload =
            serde_json::from_str(r#"{"title": "   "}"#).unwrap();
        assert!(matches!(
            project_record(payload),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn record_encodes_technologies_and_featured() {
        let payload: ProjectPayload = serde_json::from_str(
            r#"{"title": "Portfolio Site", "technologies": ["Rust", "SQLite"], "featured": true}"#,
        )
        .unwrap();
        let record = project_record(payload).unwrap();
        assert_eq!(record.technologies, r#"["Rust","SQLite"]"#);
        assert_eq!(record.featured, 1);
    }

    #[test]
    fn response_decodes_fields_and_tolerates_corrupt_json() {
        let row = ProjectRow {
            id: 1,
            title: "Portfolio Site".into(),
            description: None,
            image_url: None,
            project_url: None,
            github_url: None,
            technologies: Some(r#"["Rust","SQLite"]"#.into()),
            featured: 1,
            created_at: "2026-01-01 00:00:00".into(),
            updated_at: "2026-01-01 00:00:00".into(),
        };
        let resp = project_response(row);
        assert_eq!(resp.technologies, vec!["Rust", "SQLite"]);
        assert!(resp.featured);

        let row = ProjectRow {
            id: 2,
            title: "Other".into(),
            description: None,
            image_url: None,
            project_url: None,
            github_url: None,
            technologies: Some("{broken".into()),
            featured: 0,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let resp = project_response(row);
        assert!(resp.technologies.is_empty());
        assert!(!resp.featured);
    }
}
