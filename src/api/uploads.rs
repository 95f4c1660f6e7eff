//! Avatar upload to object storage.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, post, web};
use futures_util::StreamExt;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::ok;
use crate::auth::SessionAuth;
use crate::config::Config;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::services::ObjectStore;
use crate::services::storage::{avatar_key, extract_key_from_url, public_url_for};

/// Largest accepted avatar, in bytes.
pub const MAX_AVATAR_SIZE: usize = 5 * 1024 * 1024;

/// Largest accepted text field, in bytes.
pub const MAX_TEXT_FIELD_SIZE: usize = 2 * 1024;

/// Uploaded avatar location.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvatarUploadResponse {
    pub url: String,
}

/// Configure upload routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_avatar);
}

struct AvatarFile {
    filename: String,
    content_type: String,
    data: Vec<u8>,
}

#[derive(Default)]
struct AvatarForm {
    file: Option<AvatarFile>,
    old_avatar_url: Option<String>,
}

async fn read_text_field(field: &mut actix_multipart::Field, name: &str) -> AppResult<String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_SIZE {
            return Err(AppError::InvalidInput(format!("{} is too long", name)));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes).map_err(|_| AppError::InvalidInput("Invalid form field".to_string()))
}

/// Read the `file` and `oldAvatarUrl` fields, enforcing type and size limits on the file.
async fn read_avatar_form(payload: &mut Multipart) -> AppResult<AvatarForm> {
    let mut form = AvatarForm::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        match field.name() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_default();
                if !content_type.starts_with("image/") {
                    return Err(AppError::InvalidInput("File must be an image".to_string()));
                }

                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();

                let mut data = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk =
                        chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
                    if data.len() + chunk.len() > MAX_AVATAR_SIZE {
                        return Err(AppError::InvalidInput(
                            "File size must be less than 5MB".to_string(),
                        ));
                    }
                    data.extend_from_slice(&chunk);
                }

                form.file = Some(AvatarFile {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("oldAvatarUrl") => {
                let value = read_text_field(&mut field, "oldAvatarUrl").await?;
                form.old_avatar_url = Some(value).filter(|v| !v.trim().is_empty());
            }
            _ => {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
                }
            }
        }
    }

    Ok(form)
}

/// Upload a new avatar for the signed-in user.
///
/// Multipart fields: `file` (image, at most 5 MiB) and optional `oldAvatarUrl`. The previous
/// avatar is deleted in the background once the new one is stored.
#[utoipa::path(
    post,
    path = "/api/cloudflare/upload/avatar",
    tag = "Uploads",
    request_body(content_type = "multipart/form-data", description = "Avatar image and optional previous URL"),
    responses(
        (status = 200, description = "Avatar stored", body = AvatarUploadResponse),
        (status = 400, description = "Missing, non-image or oversized file", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/cloudflare/upload/avatar")]
pub async fn upload_avatar(
    auth: SessionAuth,
    config: web::Data<Config>,
    store: web::Data<Arc<dyn ObjectStore>>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let form = read_avatar_form(&mut payload).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    let key = avatar_key(
        auth.user_id(),
        &file.filename,
        chrono::Utc::now().timestamp_millis(),
    );
    let size = file.data.len();
    store.put(&key, file.data, &file.content_type).await?;

    let url = public_url_for(&config.storage.public_url, &key);
    info!(
        "Uploads: stored avatar {} ({} bytes) for user {}",
        key,
        size,
        auth.user_id()
    );

    if let Some(old_key) = form
        .old_avatar_url
        .as_deref()
        .and_then(|old| extract_key_from_url(&config.storage.public_url, old))
        .filter(|old_key| *old_key != key)
    {
        let store = Arc::clone(store.get_ref());
        tokio::spawn(async move {
            if let Err(e) = store.delete(&old_key).await {
                warn!("Uploads: failed to delete old avatar {}: {}", old_key, e);
            }
        });
    }

    Ok(ok(AvatarUploadResponse { url }))
}
