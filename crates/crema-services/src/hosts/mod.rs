//! Image hosting providers
//!
//! Provider A (Cloudinary) is the canonical host; Provider B (ImgBB through
//! the same-origin relay) is kept as a deprecated adapter.

pub mod cloudinary;
pub mod factory;
pub mod imgbb;
pub mod traits;

pub use cloudinary::CloudinaryHost;
pub use factory::create_image_host;
pub use imgbb::ImgbbRelayHost;
pub use traits::{HostError, HostResult, HostedImage, ImageHost};
