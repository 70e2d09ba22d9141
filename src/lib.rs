pub mod config;
pub mod errors;
pub mod image_processor;
pub mod messages;
pub mod node;
pub mod security;
pub mod uploader;

pub use config::UploadConfig;
pub use errors::{AppError, AppResult};
pub use image_processor::{ImageBatch, ImageFormat, ImageTensor};
pub use uploader::{upload_image, upload_image_with_store, NodeOutput};
