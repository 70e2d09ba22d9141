use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const FAILURE_GLYPH: &str = "❌";
pub const SUCCESS_GLYPH: &str = "✅";

/// Language used for messages shown in the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en")]
    En,
}

/// Inputs that must be non-blank before any work starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    AccessKeyId,
    AccessKeySecret,
    BucketName,
    DestPath,
}

impl RequiredField {
    pub fn key(self) -> &'static str {
        match self {
            RequiredField::AccessKeyId => "access_key_id",
            RequiredField::AccessKeySecret => "access_key_secret",
            RequiredField::BucketName => "bucket_name",
            RequiredField::DestPath => "dest_path",
        }
    }
}

impl Locale {
    pub fn empty_field(self, field: RequiredField) -> String {
        let text = match (self, field) {
            (Locale::ZhCn, RequiredField::AccessKeyId) => "AccessKey ID 不能为空",
            (Locale::ZhCn, RequiredField::AccessKeySecret) => "AccessKey Secret 不能为空",
            (Locale::ZhCn, RequiredField::BucketName) => "Bucket 名称不能为空",
            (Locale::ZhCn, RequiredField::DestPath) => "目标路径不能为空",
            (Locale::En, RequiredField::AccessKeyId) => "AccessKey ID cannot be empty",
            (Locale::En, RequiredField::AccessKeySecret) => "AccessKey Secret cannot be empty",
            (Locale::En, RequiredField::BucketName) => "Bucket name cannot be empty",
            (Locale::En, RequiredField::DestPath) => "Destination path cannot be empty",
        };
        text.to_string()
    }

    /// Message for a fault that aborted the batch, glyph included
    pub fn fault(self, error: &AppError) -> String {
        let text = match (self, error) {
            (Locale::ZhCn, AppError::AccessDenied { .. }) => {
                "访问被拒绝，请检查 AccessKey 权限".to_string()
            }
            (Locale::ZhCn, AppError::NoSuchBucket { .. }) => {
                "存储桶不存在，请检查 bucket_name".to_string()
            }
            (Locale::ZhCn, AppError::InvalidAccessKeyId { .. }) => "无效的 AccessKey ID".to_string(),
            (Locale::ZhCn, AppError::SignatureDoesNotMatch { .. }) => {
                "签名不匹配，请检查 AccessKey Secret".to_string()
            }
            (Locale::ZhCn, AppError::Storage { .. }) => format!("OSS错误: {}", error),
            (Locale::ZhCn, _) => format!("上传OSS时发生未知错误: {}", error),
            (Locale::En, AppError::AccessDenied { .. }) => {
                "Access denied, check the AccessKey permissions".to_string()
            }
            (Locale::En, AppError::NoSuchBucket { .. }) => {
                "Bucket does not exist, check bucket_name".to_string()
            }
            (Locale::En, AppError::InvalidAccessKeyId { .. }) => "Invalid AccessKey ID".to_string(),
            (Locale::En, AppError::SignatureDoesNotMatch { .. }) => {
                "Signature mismatch, check the AccessKey Secret".to_string()
            }
            (Locale::En, AppError::Storage { .. }) => format!("OSS error: {}", error),
            (Locale::En, _) => format!("Unexpected error while uploading to OSS: {}", error),
        };
        format!("{} {}", FAILURE_GLYPH, text)
    }

    pub fn upload_succeeded(self, dest_path: &str) -> String {
        match self {
            Locale::ZhCn => format!("上传成功: {}", dest_path),
            Locale::En => format!("Uploaded: {}", dest_path),
        }
    }

    pub fn upload_failed(self, dest_path: &str, status: u16) -> String {
        match self {
            Locale::ZhCn => format!("上传失败: {}, 状态码: {}", dest_path, status),
            Locale::En => format!("Upload failed: {}, status: {}", dest_path, status),
        }
    }

    pub fn file_links(self, file_urls: &str) -> String {
        match self {
            Locale::ZhCn => format!("文件链接:\n{}", file_urls),
            Locale::En => format!("File links:\n{}", file_urls),
        }
    }

    /// Noun used in log lines: encoded images versus raw files
    pub fn item_kind(self, is_image: bool) -> &'static str {
        match (self, is_image) {
            (Locale::ZhCn, true) => "图像",
            (Locale::ZhCn, false) => "文件",
            (Locale::En, true) => "Image",
            (Locale::En, false) => "File",
        }
    }
}
