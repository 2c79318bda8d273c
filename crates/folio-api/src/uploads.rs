use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use rand::Rng;
use tracing::warn;

use folio_db::models::ImageRow;
use folio_types::api::{
    Claims, ImageResponse, MessageResponse, UploadBatchResponse, UploadResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// Extensions and content-type fragments accepted for upload.
const ALLOWED_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

const MAX_BATCH_FILES: usize = 10;

// -- Validation and naming --

fn extension_of(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Extension and declared content-type must both match the allow-list,
/// then the size ceiling applies.
fn validate_upload(
    original_name: &str,
    content_type: &str,
    size: usize,
    max_bytes: usize,
) -> Result<(), ApiError> {
    let ext = extension_of(original_name).ok_or(ApiError::UnsupportedMediaType)?;
    if !ALLOWED_TYPES.contains(&ext.as_str()) {
        return Err(ApiError::UnsupportedMediaType);
    }
    if !ALLOWED_TYPES.iter().any(|t| content_type.contains(t)) {
        return Err(ApiError::UnsupportedMediaType);
    }
    if size > max_bytes {
        return Err(ApiError::PayloadTooLarge);
    }
    Ok(())
}

/// Collision-resistant name: `{field}-{millis}-{random}{.ext}`.
fn generate_filename(field: &str, original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u64 = rand::rng().random_range(0..1_000_000_000);
    match extension_of(original_name) {
        Some(ext) => format!("{}-{}-{}.{}", field, millis, suffix, ext),
        None => format!("{}-{}-{}", field, millis, suffix),
    }
}

fn image_response(row: ImageRow) -> ImageResponse {
    ImageResponse {
        id: row.id,
        url: format!("/api/images/{}", row.filename),
        filename: row.filename,
        original_name: row.original_name,
        mimetype: row.mimetype,
        size: row.size,
        created_at: row.created_at,
    }
}

/// One multipart file, buffered in memory.
struct PendingFile {
    original_name: String,
    content_type: String,
    data: Vec<u8>,
}

async fn collect_files(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Vec<PendingFile>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Multipart error: {}", e)))?
            .to_vec();
        files.push(PendingFile {
            original_name,
            content_type,
            data,
        });
    }
    Ok(files)
}

// -- Consistency protocol --
//
// 1. Write the file bytes to the storage directory.
// 2. Insert the metadata row.
// 3. If the insert fails, delete the just-written file before returning:
//    a file must never outlive its metadata row.

async fn store_upload(state: &AppState, field: &str, file: PendingFile) -> Result<ImageResponse, ApiError> {
    validate_upload(
        &file.original_name,
        &file.content_type,
        file.data.len(),
        state.max_upload_bytes,
    )?;

    let filename = generate_filename(field, &file.original_name);
    state
        .storage
        .save(&filename, &file.data)
        .await
        .map_err(ApiError::Internal)?;

    let st = state.clone();
    let fname = filename.clone();
    let path = state.storage.file_path(&filename).display().to_string();
    let size = file.data.len() as i64;
    let inserted = blocking(move || {
        let id = st.db.insert_image(
            &fname,
            &file.original_name,
            &file.content_type,
            size,
            &path,
        )?;
        st.db.get_image(id)
    })
    .await;

    match inserted {
        Ok(Some(row)) => Ok(image_response(row)),
        Ok(None) => {
            state.storage.delete(&filename).await.ok();
            Err(ApiError::Internal(anyhow::anyhow!(
                "image row missing after insert"
            )))
        }
        Err(e) => {
            state.storage.delete(&filename).await.ok();
            Err(e)
        }
    }
}

// -- Handlers --

/// POST /api/upload — single file in multipart field `image`.
pub async fn upload_single(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files = collect_files(&mut multipart, "image").await?;
    let file = match files.len() {
        0 => return Err(ApiError::NoFileProvided),
        1 => files.remove(0),
        _ => return Err(ApiError::Validation("Too many files".into())),
    };

    let stored = store_upload(&state, "image", file).await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".into(),
        file: stored,
    }))
}

/// POST /api/upload-multiple — up to 10 files in multipart field `images`.
/// Validation failures reject the whole request; a persistence failure on
/// one file cleans up that file only and the rest still go through.
pub async fn upload_multiple(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let files = collect_files(&mut multipart, "images").await?;
    if files.is_empty() {
        return Err(ApiError::NoFileProvided);
    }
    if files.len() > MAX_BATCH_FILES {
        return Err(ApiError::Validation("Too many files".into()));
    }
    for file in &files {
        validate_upload(
            &file.original_name,
            &file.content_type,
            file.data.len(),
            state.max_upload_bytes,
        )?;
    }

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        let original_name = file.original_name.clone();
        match store_upload(&state, "images", file).await {
            Ok(resp) => stored.push(resp),
            Err(e) => warn!("Upload of {} failed: {}", original_name, e),
        }
    }

    Ok(Json(UploadBatchResponse {
        message: format!("{} files uploaded successfully", stored.len()),
        files: stored,
    }))
}

/// GET /api/images — public metadata listing.
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageResponse>>, ApiError> {
    let st = state.clone();
    let rows = blocking(move || st.db.list_images()).await?;
    Ok(Json(rows.into_iter().map(image_response).collect()))
}

/// DELETE /api/images/{id} — file first (absent file is fine), then the row.
pub async fn delete_image(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let row = blocking(move || st.db.get_image(id))
        .await?
        .ok_or(ApiError::NotFound("Image"))?;

    state
        .storage
        .delete(&row.filename)
        .await
        .map_err(ApiError::Internal)?;

    let st = state.clone();
    blocking(move || st.db.delete_image(id)).await?;

    Ok(Json(MessageResponse {
        message: "Image deleted successfully".into(),
    }))
}

/// GET /api/images/{filename} — serves the stored bytes with the recorded
/// content type. Only filenames known to the metadata table are served, so
/// path traversal never reaches the filesystem.
pub async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(ApiError::NotFound("Image"));
    }

    let st = state.clone();
    let fname = filename.clone();
    let row = blocking(move || st.db.get_image_by_filename(&fname))
        .await?
        .ok_or(ApiError::NotFound("Image"))?;

    let bytes = tokio::fs::read(state.storage.file_path(&row.filename))
        .await
        .map_err(|_| ApiError::NotFound("Image"))?;

    Ok(([(header::CONTENT_TYPE, row.mimetype)], bytes))
}
