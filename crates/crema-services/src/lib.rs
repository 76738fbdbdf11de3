//! Crema Services Library
//!
//! Provider adapters behind the `ImageHost` trait, the upload dispatcher,
//! the server-side provider clients used by the relay, and the resilient
//! image loader.

pub mod cloudinary_admin;
pub mod dispatcher;
pub mod display;
pub mod hosts;
pub mod imgbb_api;

// Re-export commonly used types
pub use cloudinary_admin::{sign_params, CloudinaryAdminClient};
pub use dispatcher::UploadDispatcher;
pub use display::{HttpImageFetcher, ImageFetcher, ResilientImageLoader};
pub use hosts::{
    create_image_host, CloudinaryHost, HostError, HostResult, HostedImage, ImageHost,
    ImgbbRelayHost,
};
pub use imgbb_api::ImgbbApiClient;
