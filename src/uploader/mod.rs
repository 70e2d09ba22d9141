// Uploader module - encodes each image and writes it to OSS
//
// Keys are derived first, then images are uploaded strictly one at a time

pub mod dest_paths;
pub mod oss_client;
pub mod report;
pub mod upload_task;

pub use oss_client::{generate_file_url, ObjectStore, OssClient, PutObjectResult};
pub use report::{NodeOutput, UploadOutcome, UploadReport};
pub use upload_task::{upload_image, upload_image_with_store, UploadTask};
