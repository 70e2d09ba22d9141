use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use oss_image_uploader::config;
use oss_image_uploader::image_processor::{load_image_tensor, ImageBatch, ImageFormat};
use oss_image_uploader::node::node_definition;
use oss_image_uploader::uploader::{upload_image, NodeOutput};

#[derive(Parser)]
#[clap(name = "oss-image-uploader")]
#[clap(about = "Encode images and upload them to an Aliyun OSS bucket")]
struct Cli {
    /// Image files to upload, in order
    images: Vec<PathBuf>,
    /// AccessKey ID, overrides the config file
    #[clap(long, env = "OSS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,
    /// AccessKey Secret, overrides the config file
    #[clap(long, env = "OSS_ACCESS_KEY_SECRET", hide_env_values = true)]
    access_key_secret: Option<String>,
    /// OSS endpoint, Ex. https://oss-cn-hangzhou.aliyuncs.com
    #[clap(long)]
    endpoint: Option<String>,
    #[clap(long)]
    bucket: Option<String>,
    /// Destination key template, one per line; `{timestamp}` is filled in per key
    #[clap(long)]
    dest_path: Option<String>,
    /// PNG, JPEG or WEBP
    #[clap(long)]
    format: Option<ImageFormat>,
    /// Quality for lossy formats, 1-100
    #[clap(long)]
    quality: Option<u8>,
    /// Print per-image status lines instead of the URL list
    #[clap(long, action)]
    status: bool,
    /// Config file, defaults to the user config directory
    #[clap(long)]
    config: Option<PathBuf>,
    /// Write the effective settings (credentials included) back to the config file
    #[clap(long, action)]
    save_config: bool,
    /// Print the node definition as JSON and exit
    #[clap(long, action)]
    describe: bool,
    /// Enable debug logging
    #[clap(long, short, action)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if cli.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    if cli.describe {
        println!("{}", node_definition().to_json_pretty()?);
        return Ok(());
    }

    let mut upload_config =
        config::load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(access_key_id) = cli.access_key_id {
        upload_config.access_key_id = access_key_id;
    }
    if let Some(access_key_secret) = cli.access_key_secret {
        upload_config.access_key_secret = access_key_secret;
    }
    if let Some(endpoint) = cli.endpoint {
        upload_config.endpoint = endpoint;
    }
    if let Some(bucket) = cli.bucket {
        upload_config.bucket_name = bucket;
    }
    if let Some(dest_path) = cli.dest_path {
        upload_config.dest_path = dest_path;
    }
    if let Some(format) = cli.format {
        upload_config.image_format = format;
    }
    if let Some(quality) = cli.quality {
        upload_config.jpeg_quality = quality;
    }
    upload_config.output_image = !cli.status;

    config::validate_config(&upload_config).context("Invalid settings")?;

    if cli.save_config {
        config::save_config(&upload_config, cli.config.as_deref())
            .context("Failed to save configuration")?;
    }

    let images = cli
        .images
        .iter()
        .map(|path| {
            load_image_tensor(path).with_context(|| format!("Failed to load {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    log::info!("Starting upload of {} images", images.len());
    log::debug!("Settings: {:?}", upload_config);

    match upload_image(ImageBatch::new(images), &upload_config) {
        NodeOutput::Passthrough { file_urls, .. } => println!("{}", file_urls),
        NodeOutput::Status { text } => {
            for line in text {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
