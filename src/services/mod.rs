//! Image file services.

pub mod storage;
pub mod transform;
pub mod upload;

pub use storage::ImageStorage;
pub use transform::{TransformedImage, transform_image};
pub use upload::{ImageUpload, UploadedFile, read_image_upload};
