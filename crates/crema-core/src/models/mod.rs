//! Data models for the image layer
//!
//! Each sub-module represents one feature area: the candidate URLs stored on
//! a product or category, the file handed to the uploader, and the
//! normalized outcome of an upload.

mod asset;
mod file;
mod relay;
mod upload;

pub use asset::*;
pub use file::*;
pub use relay::*;
pub use upload::*;
