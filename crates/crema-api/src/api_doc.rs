//! OpenAPI documentation served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crema_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Crema relay API",
        version = "0.1.0",
        description = "Same-origin relay for café image uploads. Provider secrets stay on this service; clients send image data only."
    ),
    paths(
        handlers::health::health,
        handlers::upload_image::upload_image,
        handlers::cloudinary::ping,
        handlers::cloudinary::destroy,
        handlers::cloudinary::upload_proxy,
    ),
    components(schemas(
        error::ErrorResponse,
        models::RelayUploadRequest,
        models::RelayUploadResponse,
        models::UploadUrls,
        handlers::health::HealthResponse,
        handlers::cloudinary::PingResponse,
        handlers::cloudinary::DestroyRequest,
        handlers::cloudinary::DestroyResponse,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "relay", description = "ImgBB relay"),
        (name = "cloudinary", description = "Cloudinary proxy and admin")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
