//! Cloudinary routes: connectivity check, signed deletion and the
//! same-origin upload proxy.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use crema_core::{AppError, ImageFile, ProviderKind};
use crema_services::{CloudinaryAdminClient, CloudinaryHost};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "cloudName", skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DestroyRequest {
    #[validate(length(min = 1, max = 255, message = "public_id must be between 1 and 255 characters"))]
    pub public_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DestroyResponse {
    pub success: bool,
    /// Provider result, `ok` or `not found`
    pub result: String,
}

fn admin_client(state: &AppState) -> Result<CloudinaryAdminClient, HttpAppError> {
    let missing = state.config.missing_relay_vars(ProviderKind::Cloudinary);
    if !missing.is_empty() {
        return Err(AppError::missing_config(missing).into());
    }
    Ok(CloudinaryAdminClient::from_settings(
        state.http.clone(),
        state.config.providers(),
    )?)
}

/// Check the Cloudinary credentials against the admin API
#[utoipa::path(
    get,
    path = "/api/cloudinary/ping",
    tag = "cloudinary",
    responses(
        (status = 200, description = "Credentials accepted", body = PingResponse),
        (status = 502, description = "Cloudinary rejected the credentials", body = PingResponse),
        (status = 503, description = "Cloudinary not configured", body = ErrorResponse)
    )
)]
pub async fn ping(State(state): State<Arc<AppState>>) -> Result<Response, HttpAppError> {
    let admin = admin_client(&state)?;

    match admin.ping().await {
        Ok(()) => Ok(Json(PingResponse {
            success: true,
            message: "Cloudinary connection successful".to_string(),
            cloud_name: Some(admin.cloud_name().to_string()),
            error: None,
        })
        .into_response()),
        Err(e) => {
            tracing::warn!(error = %e, "Cloudinary ping failed");
            let body = PingResponse {
                success: false,
                message: "Cloudinary connection failed".to_string(),
                cloud_name: None,
                error: Some(e.to_string()),
            };
            Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response())
        }
    }
}

/// Delete an uploaded asset; the request is signed here, never by clients
#[utoipa::path(
    post,
    path = "/api/cloudinary/destroy",
    tag = "cloudinary",
    request_body = DestroyRequest,
    responses(
        (status = 200, description = "Deletion processed", body = DestroyResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "Provider error", body = ErrorResponse),
        (status = 503, description = "Cloudinary not configured", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "cloudinary_destroy"))]
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DestroyRequest>,
) -> Result<Json<DestroyResponse>, HttpAppError> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let admin = admin_client(&state)?;
    let result = admin.destroy(request.public_id.trim()).await?;

    Ok(Json(DestroyResponse {
        success: result == "ok",
        result,
    }))
}

/// Forward a multipart upload to Cloudinary and pass its answer through
#[utoipa::path(
    post,
    path = "/api/cloudinary/upload",
    tag = "cloudinary",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Provider response, passed through"),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 503, description = "Cloudinary not configured", body = ErrorResponse),
        (status = 504, description = "Upload timed out", body = ErrorResponse)
    )
)]
pub async fn upload_proxy(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let mut file: Option<ImageFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if file.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            )
            .into());
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

        file = Some(ImageFile::new(name, content_type, data));
    }

    let file = file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    state.validator.validate_contents(&file)?;

    let missing = state.config.missing_client_vars(ProviderKind::Cloudinary);
    if !missing.is_empty() {
        return Err(AppError::missing_config(missing).into());
    }

    // The proxy must call the provider itself, never its own route.
    let host = CloudinaryHost::from_settings(
        state.http.clone(),
        state.config.providers(),
        state.config.upload_timeout(),
    )
    .with_proxy_url(None);

    let (status, body) = host.upload_raw(&file).await?;
    tracing::info!(status, name = %file.name, size = file.size(), "Proxied Cloudinary upload");

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
}
