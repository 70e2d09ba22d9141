use crate::config::UploadConfig;
use crate::errors::AppError;
use crate::image_processor::{prepare_payload, ImageBatch, ImageTensor};
use crate::messages::{FAILURE_GLYPH, SUCCESS_GLYPH};
use crate::security::InputValidator;

use super::dest_paths::prepare_dest_paths;
use super::oss_client::{generate_file_url, ObjectStore, OssClient};
use super::report::{NodeOutput, UploadOutcome, UploadReport};

/// Result of uploading a single image
#[derive(Debug)]
pub enum ItemResult {
    /// Stored with HTTP 200
    Uploaded(UploadOutcome),
    /// The service answered with another status and no error
    Rejected(UploadOutcome),
    /// Encoding, transport or storage-service error
    Faulted(AppError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    AbortBatch,
}

/// Whether the loop moves on to the next image after `result`.
///
/// A rejected status only costs that one image, while any fault stops the
/// whole batch, even when the fault is specific to one object.
pub fn next_action(result: &ItemResult) -> LoopAction {
    match result {
        ItemResult::Uploaded(_) => LoopAction::Continue,
        ItemResult::Rejected(_) => LoopAction::Continue,
        ItemResult::Faulted(_) => LoopAction::AbortBatch,
    }
}

/// Upload a batch to OSS with the given settings
pub fn upload_image(images: ImageBatch, config: &UploadConfig) -> NodeOutput {
    if let Some(output) = reject_missing_fields(&images, config) {
        return output;
    }

    match OssClient::new(
        &config.access_key_id,
        &config.access_key_secret,
        &config.endpoint,
        &config.bucket_name,
    ) {
        Ok(client) => run_upload(images, config, &client),
        Err(e) => {
            let message = config.locale.fault(&e);
            log::error!("{}", message);
            log::error!("Failed to create OSS client: {:?}", e);
            let report = UploadReport::aborted(message);
            NodeOutput::from_report(&report, images, config.output_image, config.locale)
        }
    }
}

/// Same as [`upload_image`] against any object store
pub fn upload_image_with_store<S>(images: ImageBatch, config: &UploadConfig, store: &S) -> NodeOutput
where
    S: ObjectStore + ?Sized,
{
    if let Some(output) = reject_missing_fields(&images, config) {
        return output;
    }

    run_upload(images, config, store)
}

fn reject_missing_fields(images: &ImageBatch, config: &UploadConfig) -> Option<NodeOutput> {
    let field = InputValidator::first_missing_field(
        &config.access_key_id,
        &config.access_key_secret,
        &config.bucket_name,
        &config.dest_path,
    )?;

    let message = config.locale.empty_field(field);
    log::error!("{} {}", FAILURE_GLYPH, message);
    Some(NodeOutput::rejected(
        images.clone(),
        config.output_image,
        message,
    ))
}

fn run_upload<S>(images: ImageBatch, config: &UploadConfig, store: &S) -> NodeOutput
where
    S: ObjectStore + ?Sized,
{
    let report = UploadTask::new(config, store).run(&images);

    log::info!(
        "Uploaded {}/{} images to bucket {}",
        report.succeeded(),
        images.len(),
        config.bucket_name.trim()
    );

    NodeOutput::from_report(&report, images, config.output_image, config.locale)
}

/// Sequential upload of one batch against one store
pub struct UploadTask<'a, S: ObjectStore + ?Sized> {
    config: &'a UploadConfig,
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> UploadTask<'a, S> {
    pub fn new(config: &'a UploadConfig, store: &'a S) -> Self {
        Self { config, store }
    }

    pub fn run(&self, images: &ImageBatch) -> UploadReport {
        let total = images.len();
        let dest_paths = prepare_dest_paths(&self.config.dest_path, total, self.config.image_format);
        let mut report = UploadReport::default();

        for (index, (image, dest_path)) in images.iter().zip(&dest_paths).enumerate() {
            let result = self.upload_item(index, total, image, dest_path);
            let action = next_action(&result);

            match result {
                ItemResult::Uploaded(outcome) | ItemResult::Rejected(outcome) => {
                    report.outcomes.push(outcome);
                }
                ItemResult::Faulted(e) => {
                    let message = self.config.locale.fault(&e);
                    log::error!("{}", message);
                    if !e.is_storage_fault() {
                        log::error!(
                            "Unexpected failure on item {}/{} ({}): {:?}",
                            index + 1,
                            total,
                            dest_path,
                            e
                        );
                    }
                    report.abort_message = Some(message);
                }
            }

            if action == LoopAction::AbortBatch {
                log::warn!(
                    "Stopping batch after item {}/{}, {} items not attempted",
                    index + 1,
                    total,
                    total - index - 1
                );
                break;
            }
        }

        report
    }

    pub fn upload_item(
        &self,
        index: usize,
        total: usize,
        image: &ImageTensor,
        dest_path: &str,
    ) -> ItemResult {
        let locale = self.config.locale;
        let payload = match prepare_payload(
            image,
            dest_path,
            self.config.image_format,
            self.config.effective_quality(),
        ) {
            Ok(payload) => payload,
            Err(e) => return ItemResult::Faulted(e),
        };

        let size = payload.data.len();
        let is_image = payload.is_image;
        let kind = locale.item_kind(is_image);

        let result = match self
            .store
            .put_object(dest_path, payload.data, payload.content_type)
        {
            Ok(result) => result,
            Err(e) => return ItemResult::Faulted(e),
        };

        if result.status == 200 {
            let url = generate_file_url(
                &self.config.endpoint,
                self.config.bucket_name.trim(),
                dest_path,
            );
            log::info!(
                "{} {} {}/{} uploaded to OSS: {}",
                SUCCESS_GLYPH,
                kind,
                index + 1,
                total,
                dest_path
            );
            log::info!("📊 Size: {} bytes", size);

            ItemResult::Uploaded(UploadOutcome {
                index,
                dest_path: dest_path.to_string(),
                success: true,
                url,
                size,
                status: result.status,
                is_image,
                status_line: locale.upload_succeeded(dest_path),
            })
        } else {
            log::warn!(
                "{} {} {}/{} upload failed, status {}",
                FAILURE_GLYPH,
                kind,
                index + 1,
                total,
                result.status
            );

            ItemResult::Rejected(UploadOutcome {
                index,
                dest_path: dest_path.to_string(),
                success: false,
                url: String::new(),
                size,
                status: result.status,
                is_image,
                status_line: locale.upload_failed(dest_path, result.status),
            })
        }
    }
}
