//! Domain models and DTOs for the annotation catalog.

pub mod annotation;
pub mod filter;
pub mod image;
pub mod transform;

// Re-export commonly used types
pub use annotation::{AnnotationCreate, AnnotationRead, AnnotationUpdate, Polygon};
pub use filter::ImageFilter;
pub use image::{DeleteImageResponse, ImageCreate, ImageRead, MlTag};
pub use transform::{TransformParams, TransformQuery};
