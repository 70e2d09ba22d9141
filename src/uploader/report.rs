use serde::Serialize;

use crate::image_processor::ImageBatch;
use crate::messages::Locale;

/// What happened to one image. Built once in the upload loop and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub index: usize,
    pub dest_path: String,
    pub success: bool,
    /// Public URL, empty when the upload failed
    pub url: String,
    pub size: usize,
    pub status: u16,
    pub is_image: bool,
    pub status_line: String,
}

/// Outcomes of one call, in input order, plus the message of the fault that
/// stopped the batch early, if any
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
    pub abort_message: Option<String>,
}

impl UploadReport {
    pub fn aborted(message: String) -> Self {
        Self {
            outcomes: Vec::new(),
            abort_message: Some(message),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_message.is_some()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// One line per processed image; failed uploads leave an empty line
    pub fn file_urls(&self) -> String {
        self.outcomes
            .iter()
            .map(|o| o.url.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lines for the status panel: per-item lines, then either the links or
    /// the abort message
    pub fn status_text(&self, locale: Locale) -> Vec<String> {
        let mut text: Vec<String> = self
            .outcomes
            .iter()
            .map(|o| o.status_line.clone())
            .collect();

        match &self.abort_message {
            Some(message) => text.push(message.clone()),
            None => text.push(locale.file_links(&self.file_urls())),
        }

        text
    }
}

/// The two output shapes of the node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// Original images plus newline-joined URLs
    Passthrough { images: ImageBatch, file_urls: String },
    /// Text lines for the host's status panel
    Status { text: Vec<String> },
}

impl NodeOutput {
    pub fn from_report(
        report: &UploadReport,
        images: ImageBatch,
        output_image: bool,
        locale: Locale,
    ) -> Self {
        if output_image {
            NodeOutput::Passthrough {
                images,
                file_urls: report.file_urls(),
            }
        } else {
            NodeOutput::Status {
                text: report.status_text(locale),
            }
        }
    }

    /// Early return used before any work was done
    pub fn rejected(images: ImageBatch, output_image: bool, message: String) -> Self {
        if output_image {
            NodeOutput::Passthrough {
                images,
                file_urls: String::new(),
            }
        } else {
            NodeOutput::Status {
                text: vec![message],
            }
        }
    }

    pub fn file_urls(&self) -> Option<&str> {
        match self {
            NodeOutput::Passthrough { file_urls, .. } => Some(file_urls),
            NodeOutput::Status { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&[String]> {
        match self {
            NodeOutput::Passthrough { .. } => None,
            NodeOutput::Status { text } => Some(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, success: bool) -> UploadOutcome {
        let dest_path = format!("img-{}.png", index);
        UploadOutcome {
            index,
            url: if success {
                format!("https://b.oss-cn-hangzhou.aliyuncs.com/{}", dest_path)
            } else {
                String::new()
            },
            status_line: if success {
                Locale::ZhCn.upload_succeeded(&dest_path)
            } else {
                Locale::ZhCn.upload_failed(&dest_path, 203)
            },
            dest_path,
            success,
            size: 10,
            status: if success { 200 } else { 203 },
            is_image: true,
        }
    }

    #[test]
    fn test_file_urls_keep_empty_entries() {
        let report = UploadReport {
            outcomes: vec![outcome(0, true), outcome(1, false), outcome(2, true)],
            abort_message: None,
        };
        let urls = report.file_urls();
        let lines: Vec<&str> = urls.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].is_empty());
        assert_eq!(report.succeeded(), 2);
    }

    #[test]
    fn test_status_text_ends_with_links() {
        let report = UploadReport {
            outcomes: vec![outcome(0, true)],
            abort_message: None,
        };
        let text = report.status_text(Locale::ZhCn);
        assert_eq!(text.len(), 2);
        assert_eq!(text[0], "上传成功: img-0.png");
        assert_eq!(
            text[1],
            "文件链接:\nhttps://b.oss-cn-hangzhou.aliyuncs.com/img-0.png"
        );
    }

    #[test]
    fn test_status_text_ends_with_abort_message() {
        let report = UploadReport {
            outcomes: vec![outcome(0, true)],
            abort_message: Some("❌ boom".to_string()),
        };
        let text = report.status_text(Locale::En);
        assert_eq!(text.last().map(String::as_str), Some("❌ boom"));
        assert!(report.is_aborted());
    }

    #[test]
    fn test_rejected_output_shapes() {
        let output = NodeOutput::rejected(ImageBatch::default(), true, "msg".to_string());
        assert_eq!(output.file_urls(), Some(""));

        let output = NodeOutput::rejected(ImageBatch::default(), false, "msg".to_string());
        assert_eq!(output.text(), Some(&["msg".to_string()][..]));
    }
}
