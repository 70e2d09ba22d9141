use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{DEFAULT_DEST_PATH, DEFAULT_ENDPOINT, DEFAULT_QUALITY};
use crate::errors::AppResult;
use crate::image_processor::ImageFormat;

pub const NODE_CLASS_NAME: &str = "UploadAliyunOSS";
pub const NODE_DISPLAY_NAME: &str = "Upload to Aliyun OSS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputKind {
    Image,
    String,
    Int,
    Boolean,
    Combo,
}

/// One input socket or widget as the host declares it
#[derive(Debug, Clone, Serialize)]
pub struct InputSpec {
    pub name: &'static str,
    pub kind: InputKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
}

impl InputSpec {
    fn new(name: &'static str, kind: InputKind) -> Self {
        Self {
            name,
            kind,
            default: None,
            multiline: None,
            min: None,
            max: None,
            step: None,
            options: Vec::new(),
        }
    }

    fn text(name: &'static str, default: &str, multiline: bool) -> Self {
        Self {
            default: Some(json!(default)),
            multiline: Some(multiline),
            ..Self::new(name, InputKind::String)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeInputs {
    pub required: Vec<InputSpec>,
    pub optional: Vec<InputSpec>,
}

/// Metadata the host needs to register and draw the node
#[derive(Debug, Clone, Serialize)]
pub struct NodeDefinition {
    pub class_name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub function: &'static str,
    pub output_node: bool,
    pub return_types: Vec<InputKind>,
    pub return_names: Vec<&'static str>,
    pub inputs: NodeInputs,
}

impl NodeDefinition {
    pub fn to_json_pretty(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn node_definition() -> NodeDefinition {
    let required = vec![
        InputSpec::new("image", InputKind::Image),
        InputSpec::text("access_key_id", "", false),
        InputSpec::text("access_key_secret", "", false),
        InputSpec::text("endpoint", DEFAULT_ENDPOINT, false),
        InputSpec::text("bucket_name", "", false),
        InputSpec::text("dest_path", DEFAULT_DEST_PATH, true),
    ];

    let optional = vec![
        InputSpec {
            default: Some(json!(ImageFormat::default().name())),
            options: ImageFormat::ALL.iter().map(|f| f.name()).collect(),
            ..InputSpec::new("image_format", InputKind::Combo)
        },
        InputSpec {
            default: Some(json!(DEFAULT_QUALITY)),
            min: Some(1),
            max: Some(100),
            step: Some(1),
            ..InputSpec::new("jpeg_quality", InputKind::Int)
        },
        InputSpec {
            default: Some(json!(true)),
            ..InputSpec::new("output_image", InputKind::Boolean)
        },
    ];

    NodeDefinition {
        class_name: NODE_CLASS_NAME,
        display_name: NODE_DISPLAY_NAME,
        category: "image/upload",
        description: "Upload image to Aliyun OSS and return the original image",
        function: "upload_image",
        // Marked as an output node so a graph ending here still runs
        output_node: true,
        return_types: vec![InputKind::Image, InputKind::String],
        return_names: vec!["image", "file_urls"],
        inputs: NodeInputs { required, optional },
    }
}
