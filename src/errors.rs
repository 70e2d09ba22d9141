use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid image tensor: {reason}")]
    InvalidImage { reason: String },

    #[error("Encoding failed for {format}: {reason}")]
    Encoding { format: String, reason: String },

    // Storage service faults, one per OSS error code we surface explicitly
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    #[error("Bucket not found: {bucket}")]
    NoSuchBucket { bucket: String },

    #[error("Invalid AccessKey ID: {message}")]
    InvalidAccessKeyId { message: String },

    #[error("Signature does not match: {message}")]
    SignatureDoesNotMatch { message: String },

    #[error("OSS error {status} {code}: {message} (request id: {request_id})")]
    Storage {
        status: u16,
        code: String,
        message: String,
        request_id: String,
    },
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid_image(reason: &str) -> Self {
        Self::InvalidImage {
            reason: reason.to_string(),
        }
    }

    pub fn encoding(format: &str, reason: &str) -> Self {
        Self::Encoding {
            format: format.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Map an OSS error response onto the fault taxonomy
    pub fn from_oss_response(
        status: u16,
        code: &str,
        message: &str,
        request_id: &str,
        bucket: &str,
    ) -> Self {
        match code {
            "AccessDenied" => Self::AccessDenied {
                message: message.to_string(),
            },
            "NoSuchBucket" => Self::NoSuchBucket {
                bucket: bucket.to_string(),
            },
            "InvalidAccessKeyId" => Self::InvalidAccessKeyId {
                message: message.to_string(),
            },
            "SignatureDoesNotMatch" => Self::SignatureDoesNotMatch {
                message: message.to_string(),
            },
            _ => Self::Storage {
                status,
                code: code.to_string(),
                message: message.to_string(),
                request_id: request_id.to_string(),
            },
        }
    }

    /// Faults reported by the storage service itself, as opposed to local or transport errors
    pub fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            AppError::AccessDenied { .. }
                | AppError::NoSuchBucket { .. }
                | AppError::InvalidAccessKeyId { .. }
                | AppError::SignatureDoesNotMatch { .. }
                | AppError::Storage { .. }
        )
    }
}
