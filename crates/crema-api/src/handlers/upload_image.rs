use std::sync::Arc;

use axum::{extract::State, Json};
use crema_core::{AppError, ProviderKind, RelayUploadRequest, RelayUploadResponse};
use crema_services::ImgbbApiClient;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Relay a base64 image to ImgBB
///
/// The ImgBB key never leaves the server; clients send only the image data.
///
/// # Errors
/// - `AppError::InvalidInput` - empty `image`
/// - `AppError::Configuration` - `IMGBB_API_KEY` is unset
/// - `AppError::Network` - ImgBB rejected the upload or answered with a URL
///   outside the host allow-list
#[utoipa::path(
    post,
    path = "/api/upload-image",
    tag = "relay",
    request_body = RelayUploadRequest,
    responses(
        (status = 200, description = "Image uploaded", body = RelayUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "Provider rejected the upload", body = ErrorResponse),
        (status = 503, description = "Relay not configured", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "relay_upload"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RelayUploadRequest>,
) -> Result<Json<RelayUploadResponse>, HttpAppError> {
    if request.image.trim().is_empty() {
        return Err(AppError::InvalidInput("image is required".to_string()).into());
    }

    let missing = state.config.missing_relay_vars(ProviderKind::Imgbb);
    if !missing.is_empty() {
        return Err(AppError::missing_config(missing).into());
    }

    let providers = state.config.providers();
    let api_key = providers.imgbb_api_key.clone().unwrap_or_default();
    let client = ImgbbApiClient::new(state.http.clone(), api_key, &providers.imgbb_api_base);

    let response = client.upload_base64(&request.image).await?;

    if let Some(url) = response.url.as_deref() {
        if let Err(reason) = state.allow_list.check(url) {
            tracing::warn!(url = %url, reason = %reason, "ImgBB URL rejected");
            return Err(AppError::network(
                "Upload provider returned an unrecognized host",
                None,
                None,
            )
            .into());
        }
    }

    tracing::info!(
        url = response.url.as_deref().unwrap_or_default(),
        size = ?response.size,
        "Relayed image upload"
    );

    Ok(Json(response))
}
