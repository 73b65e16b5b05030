//! Multipart ingestion for `POST /schools`.
//!
//! Text parts are collected into a [`SchoolForm`]. The `image` part is
//! streamed chunk by chunk into a staging file, so an oversized upload is cut
//! off at the cap instead of being buffered or written out in full.

use crate::error::{GatewayError, Result};
use crate::registry::{AssetStore, PendingAsset};
use crate::school::{is_allowed_image_type, SchoolForm, TEXT_FIELDS};
use axum::http::StatusCode;
use axum_extra::extract::multipart::{Field, MultipartError};
use axum_extra::extract::Multipart;
use tracing::{debug, warn};

pub struct SchoolSubmission {
    pub form: SchoolForm,
    pub image: Option<PendingAsset>,
}

pub async fn read_submission(
    multipart: &mut Multipart,
    assets: &AssetStore,
) -> Result<SchoolSubmission> {
    let mut form = SchoolForm::default();
    let mut image: Option<PendingAsset> = None;

    // Parse multipart form
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        if name == "image" {
            if image.is_some() {
                return Err(GatewayError::InvalidRequest {
                    message: "Only one image may be uploaded".to_string(),
                });
            }
            image = stage_image(field, assets).await?;
        } else if TEXT_FIELDS.contains(&name.as_str()) {
            let value = field.text().await.map_err(|e| GatewayError::InvalidRequest {
                message: format!("Failed to read {} field: {}", name, e.body_text()),
            })?;
            form.set(&name, value);
        } else {
            warn!("Unknown field in multipart: {}", name);
        }
    }

    Ok(SchoolSubmission { form, image })
}

async fn stage_image(mut field: Field, assets: &AssetStore) -> Result<Option<PendingAsset>> {
    let file_name = field.file_name().unwrap_or("").to_string();
    let content_type = field.content_type().unwrap_or("").to_string();
    let allowed = is_allowed_image_type(&content_type);

    if !allowed && !file_name.is_empty() {
        return Err(GatewayError::UnsupportedMediaType { content_type });
    }

    let first = loop {
        match field.chunk().await.map_err(multipart_error)? {
            Some(chunk) if chunk.is_empty() => continue,
            other => break other,
        }
    };

    let Some(first) = first else {
        // Browsers send an empty, unnamed part when no file was picked
        if file_name.is_empty() {
            debug!("Empty image part, registering without image");
            return Ok(None);
        }
        return Err(GatewayError::InvalidRequest {
            message: format!("Uploaded image '{}' is empty", file_name),
        });
    };

    if !allowed {
        return Err(GatewayError::UnsupportedMediaType { content_type });
    }

    let mut pending = assets.begin(&file_name, &content_type).await?;
    pending.write_chunk(&first).await?;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        pending.write_chunk(&chunk).await?;
    }

    debug!(
        "Received image '{}' ({}, {} bytes)",
        pending.original_name(),
        pending.content_type(),
        pending.size()
    );

    Ok(Some(pending))
}

fn multipart_error(err: MultipartError) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge {
            message: "Request body is too large".to_string(),
        }
    } else {
        GatewayError::InvalidRequest {
            message: format!("Failed to parse multipart form: {}", err.body_text()),
        }
    }
}
