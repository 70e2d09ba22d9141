use crate::errors::{AppError, AppResult};
use crate::messages::RequiredField;

pub struct InputValidator;

impl InputValidator {
    /// First required field that is blank after trimming, checked in input order
    pub fn first_missing_field(
        access_key_id: &str,
        access_key_secret: &str,
        bucket_name: &str,
        dest_path: &str,
    ) -> Option<RequiredField> {
        [
            (access_key_id, RequiredField::AccessKeyId),
            (access_key_secret, RequiredField::AccessKeySecret),
            (bucket_name, RequiredField::BucketName),
            (dest_path, RequiredField::DestPath),
        ]
        .into_iter()
        .find(|(value, _)| value.trim().is_empty())
        .map(|(_, field)| field)
    }

    pub fn validate_quality(quality: u8) -> AppResult<()> {
        if quality == 0 || quality > 100 {
            return Err(AppError::validation(
                "jpeg_quality",
                "Quality must be between 1 and 100",
            ));
        }
        Ok(())
    }

    pub fn validate_endpoint(endpoint: &str) -> AppResult<()> {
        let trimmed = endpoint.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("endpoint", "Endpoint cannot be empty"));
        }

        if trimmed.contains(char::is_whitespace) {
            return Err(AppError::validation(
                "endpoint",
                "Endpoint must not contain whitespace",
            ));
        }

        Ok(())
    }
}
