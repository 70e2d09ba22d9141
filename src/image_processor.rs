use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GrayAlphaImage, GrayImage, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::{AppError, AppResult};

/// Extensions that denote an image container; anything else is uploaded as raw bytes
pub const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".webp"];

const RAW_CONTENT_TYPES: [(&str, &str); 11] = [
    (".mp4", "video/mp4"),
    (".avi", "video/x-msvideo"),
    (".mov", "video/quicktime"),
    (".mkv", "video/x-matroska"),
    (".wmv", "video/x-ms-wmv"),
    (".flv", "video/x-flv"),
    (".webm", "video/webm"),
    (".gif", "image/gif"),
    (".bmp", "image/bmp"),
    (".tiff", "image/tiff"),
    (".tga", "image/x-tga"),
];

const DEFAULT_RAW_CONTENT_TYPE: &str = "application/octet-stream";

// libwebp refuses anything larger on either side
const WEBP_MAX_DIMENSION: u32 = 16383;

/// A single image as produced by the pipeline host: normalized samples in
/// height x width x channels order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    width: u32,
    height: u32,
    channels: u8,
    samples: Vec<f32>,
}

impl ImageTensor {
    pub fn new(width: u32, height: u32, channels: u8, samples: Vec<f32>) -> AppResult<Self> {
        if width == 0 || height == 0 {
            return Err(AppError::invalid_image("image must be at least 1x1"));
        }

        if !(1..=4).contains(&channels) {
            return Err(AppError::invalid_image(&format!(
                "unsupported channel count {}",
                channels
            )));
        }

        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(AppError::invalid_image(&format!(
                "expected {} samples for {}x{}x{}, got {}",
                expected,
                height,
                width,
                channels,
                samples.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self.channels, 2 | 4)
    }

    /// Scale samples into the 0-255 byte range, truncating like a plain cast
    pub fn to_bytes(&self) -> Vec<u8> {
        self.samples
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8)
            .collect()
    }

    pub fn to_dynamic_image(&self) -> AppResult<DynamicImage> {
        let (w, h) = (self.width, self.height);
        let bytes = self.to_bytes();
        let shape_error = || AppError::invalid_image("sample buffer does not match dimensions");

        let img = match self.channels {
            1 => DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, bytes).ok_or_else(shape_error)?),
            2 => DynamicImage::ImageLumaA8(
                GrayAlphaImage::from_raw(w, h, bytes).ok_or_else(shape_error)?,
            ),
            3 => DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, bytes).ok_or_else(shape_error)?),
            _ => DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, bytes).ok_or_else(shape_error)?),
        };

        Ok(img)
    }

    pub fn from_dynamic_image(img: &DynamicImage) -> Self {
        let color = img.color();
        let (channels, bytes) = match (color.channel_count(), color.has_alpha()) {
            (1, _) => (1, img.to_luma8().into_raw()),
            (2, _) => (2, img.to_luma_alpha8().into_raw()),
            (_, false) => (3, img.to_rgb8().into_raw()),
            (_, true) => (4, img.to_rgba8().into_raw()),
        };

        Self {
            width: img.width(),
            height: img.height(),
            channels,
            samples: bytes.into_iter().map(|b| b as f32 / 255.0).collect(),
        }
    }
}

/// Ordered batch of images; a single image is a batch of one
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageBatch {
    images: Vec<ImageTensor>,
}

impl ImageBatch {
    pub fn new(images: Vec<ImageTensor>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageTensor> {
        self.images.iter()
    }

    pub fn images(&self) -> &[ImageTensor] {
        &self.images
    }
}

impl From<ImageTensor> for ImageBatch {
    fn from(image: ImageTensor) -> Self {
        Self {
            images: vec![image],
        }
    }
}

impl From<Vec<ImageTensor>> for ImageBatch {
    fn from(images: Vec<ImageTensor>) -> Self {
        Self { images }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageFormat {
    #[default]
    Png = 0,
    Jpeg = 1,
    Webp = 2,
}

type EncodeFn = fn(&DynamicImage, u8) -> AppResult<Vec<u8>>;

struct FormatEntry {
    format: ImageFormat,
    name: &'static str,
    extension: &'static str,
    content_type: &'static str,
    encode: EncodeFn,
}

// Indexed by the ImageFormat discriminant
static FORMAT_TABLE: [FormatEntry; 3] = [
    FormatEntry {
        format: ImageFormat::Png,
        name: "PNG",
        extension: ".png",
        content_type: "image/png",
        encode: encode_png,
    },
    FormatEntry {
        format: ImageFormat::Jpeg,
        name: "JPEG",
        extension: ".jpg",
        content_type: "image/jpeg",
        encode: encode_jpeg,
    },
    FormatEntry {
        format: ImageFormat::Webp,
        name: "WEBP",
        extension: ".webp",
        content_type: "image/webp",
        encode: encode_webp,
    },
];

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Webp];

    fn entry(self) -> &'static FormatEntry {
        &FORMAT_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Canonical extension, including the leading dot
    pub fn extension(self) -> &'static str {
        self.entry().extension
    }

    pub fn content_type(self) -> &'static str {
        self.entry().content_type
    }

    pub fn encode(self, img: &DynamicImage, quality: u8) -> AppResult<Vec<u8>> {
        (self.entry().encode)(img, quality)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FORMAT_TABLE
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(wanted))
            .map(|entry| entry.format)
            .ok_or_else(|| {
                AppError::validation("image_format", "Must be one of PNG, JPEG or WEBP")
            })
    }
}

fn encode_png(img: &DynamicImage, _quality: u8) -> AppResult<Vec<u8>> {
    let mut output = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut output, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(output)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> AppResult<Vec<u8>> {
    let flattened;
    let source = if img.color().has_alpha() {
        flattened = flatten_onto_white(img);
        &flattened
    } else {
        img
    };

    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));
    source.write_with_encoder(encoder)?;
    Ok(output)
}

fn encode_webp(img: &DynamicImage, quality: u8) -> AppResult<Vec<u8>> {
    let (width, height) = (img.width(), img.height());
    if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
        return Err(AppError::encoding(
            "WEBP",
            &format!(
                "{}x{} exceeds the {} pixel limit",
                width, height, WEBP_MAX_DIMENSION
            ),
        ));
    }

    let quality = quality.clamp(1, 100) as f32;
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, quality)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, quality)
    };

    let memory = encoded.map_err(|e| AppError::encoding("WEBP", &format!("{:?}", e)))?;
    Ok(memory.to_vec())
}

/// Composite onto an opaque white background, using alpha as the blend mask
fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let mut background = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        background.put_pixel(x, y, Rgb([blend(r, a), blend(g, a), blend(b, a)]));
    }

    DynamicImage::ImageRgb8(background)
}

fn blend(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (channel as u32, alpha as u32);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Split a path into (stem, extension) the way file names are usually read:
/// the extension starts at the last dot of the final component, and dots that
/// lead the file name do not count. A final component that is nothing but an
/// image extension (`out/.png`) is all extension.
pub fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    if is_image_extension(name) {
        return path.split_at(name_start);
    }

    let leading_dots = name.len() - name.trim_start_matches('.').len();

    match name[leading_dots..].rfind('.') {
        Some(dot) => path.split_at(name_start + leading_dots + dot),
        None => (path, ""),
    }
}

/// Lowercased extension with its leading dot, or an empty string
pub fn extension_of(path: &str) -> String {
    split_extension(path).1.to_ascii_lowercase()
}

pub fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
}

/// Content type for bytes uploaded without an image container
pub fn raw_content_type(extension: &str) -> &'static str {
    let extension = extension.to_ascii_lowercase();
    RAW_CONTENT_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
        .unwrap_or(DEFAULT_RAW_CONTENT_TYPE)
}

/// Bytes ready to be written to the bucket
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub data: Vec<u8>,
    pub content_type: &'static str,
    pub is_image: bool,
}

/// Encode an image for its destination. Image-container destinations are
/// encoded with `format`; anything else gets the raw scaled samples.
pub fn prepare_payload(
    image: &ImageTensor,
    dest_path: &str,
    format: ImageFormat,
    quality: u8,
) -> AppResult<EncodedPayload> {
    let extension = extension_of(dest_path);

    if !is_image_extension(&extension) {
        let content_type = raw_content_type(&extension);
        log::debug!(
            "Uploading raw samples for {} as {} ({}x{}x{})",
            dest_path,
            content_type,
            image.height(),
            image.width(),
            image.channels()
        );
        return Ok(EncodedPayload {
            data: image.to_bytes(),
            content_type,
            is_image: false,
        });
    }

    let img = image.to_dynamic_image()?;
    let data = format.encode(&img, quality)?;

    log::debug!(
        "Encoded {}x{} image as {} (quality: {}, {} bytes)",
        image.width(),
        image.height(),
        format,
        quality,
        data.len()
    );

    Ok(EncodedPayload {
        data,
        content_type: format.content_type(),
        is_image: true,
    })
}

/// Decode an image file into a tensor, used by the command line front end
pub fn load_image_tensor(path: &Path) -> AppResult<ImageTensor> {
    let img = image::open(path)?;
    log::debug!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );
    Ok(ImageTensor::from_dynamic_image(&img))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_tensor(width: u32, height: u32, channels: u8) -> ImageTensor {
        let count = (width * height) as usize * channels as usize;
        let samples = (0..count).map(|i| (i % 17) as f32 / 16.0).collect();
        ImageTensor::new(width, height, channels, samples).unwrap()
    }

    #[test]
    fn test_tensor_rejects_mismatched_samples() {
        let result = ImageTensor::new(2, 2, 3, vec![0.0; 11]);
        assert!(matches!(result, Err(AppError::InvalidImage { .. })));
    }

    #[test]
    fn test_tensor_rejects_unsupported_channels() {
        assert!(ImageTensor::new(1, 1, 5, vec![0.0; 5]).is_err());
        assert!(ImageTensor::new(1, 1, 0, vec![]).is_err());
        assert!(ImageTensor::new(0, 1, 3, vec![]).is_err());
    }

    #[test]
    fn test_to_bytes_scales_and_clamps() {
        let tensor = ImageTensor::new(1, 1, 4, vec![0.0, 0.5, 1.0, 1.7]).unwrap();
        assert_eq!(tensor.to_bytes(), vec![0, 127, 255, 255]);

        let negative = ImageTensor::new(1, 1, 1, vec![-0.3]).unwrap();
        assert_eq!(negative.to_bytes(), vec![0]);
    }

    #[test]
    fn test_format_table_is_indexed_by_variant() {
        for format in ImageFormat::ALL {
            assert_eq!(format.entry().format, format);
        }
        assert_eq!(ImageFormat::Jpeg.extension(), ".jpg");
        assert_eq!(ImageFormat::Webp.content_type(), "image/webp");
        assert_eq!(ImageFormat::Png.to_string(), "PNG");
    }

    #[test]
    fn test_format_parsing_is_case_insensitive() {
        assert_eq!("jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!(" WebP ".parse::<ImageFormat>().unwrap(), ImageFormat::Webp);
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn test_format_serializes_uppercase() {
        let json = serde_json::to_string(&ImageFormat::Webp).unwrap();
        assert_eq!(json, "\"WEBP\"");
        let parsed: ImageFormat = serde_json::from_str("\"JPEG\"").unwrap();
        assert_eq!(parsed, ImageFormat::Jpeg);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("out/img.png"), ("out/img", ".png"));
        assert_eq!(split_extension("out/img"), ("out/img", ""));
        assert_eq!(split_extension("dir.v2/img"), ("dir.v2/img", ""));
        assert_eq!(split_extension("a/.hidden"), ("a/.hidden", ""));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("out/.png"), ("out/", ".png"));
        assert_eq!(split_extension(".JPEG"), ("", ".JPEG"));
        assert_eq!(split_extension("out/.gz"), ("out/.gz", ""));
        assert_eq!(extension_of("Photo.JPEG"), ".jpeg");
    }

    #[test]
    fn test_raw_content_types() {
        assert_eq!(raw_content_type(".mp4"), "video/mp4");
        assert_eq!(raw_content_type(".MOV"), "video/quicktime");
        assert_eq!(raw_content_type(".tga"), "image/x-tga");
        assert_eq!(raw_content_type(".bin"), "application/octet-stream");
        assert_eq!(raw_content_type(""), "application/octet-stream");
    }

    #[test]
    fn test_png_round_trip_is_lossless() {
        let tensor = gradient_tensor(5, 3, 4);
        let payload = prepare_payload(&tensor, "a.png", ImageFormat::Png, 95).unwrap();

        assert!(payload.is_image);
        assert_eq!(payload.content_type, "image/png");

        let decoded = image::load_from_memory(&payload.data).unwrap();
        assert_eq!(decoded.width(), 5);
        assert_eq!(decoded.height(), 3);
        assert_eq!(decoded.to_rgba8().into_raw(), tensor.to_bytes());
    }

    #[test]
    fn test_jpeg_preserves_dimensions_and_drops_alpha() {
        let tensor = gradient_tensor(9, 7, 4);
        let payload = prepare_payload(&tensor, "a.jpg", ImageFormat::Jpeg, 80).unwrap();

        assert_eq!(payload.content_type, "image/jpeg");
        let decoded = image::load_from_memory(&payload.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (9, 7));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_jpeg_composites_transparency_over_white() {
        // Fully transparent black must come out white
        let samples = [0.0, 0.0, 0.0, 0.0].repeat(64);
        let tensor = ImageTensor::new(8, 8, 4, samples).unwrap();
        let payload = prepare_payload(&tensor, "a.jpg", ImageFormat::Jpeg, 95).unwrap();

        let decoded = image::load_from_memory(&payload.data).unwrap().to_rgb8();
        for pixel in decoded.pixels() {
            assert!(pixel.0.iter().all(|&c| c >= 245), "pixel {:?}", pixel);
        }
    }

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(blend(10, 255), 10);
        assert_eq!(blend(10, 0), 255);
    }

    #[test]
    fn test_webp_preserves_dimensions() {
        let tensor = gradient_tensor(6, 4, 3);
        let payload = prepare_payload(&tensor, "a.webp", ImageFormat::Webp, 90).unwrap();

        assert_eq!(payload.content_type, "image/webp");
        let decoded = image::load_from_memory(&payload.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
    }

    #[test]
    fn test_non_image_destination_skips_encoding() {
        let tensor = gradient_tensor(2, 2, 3);
        let payload = prepare_payload(&tensor, "clip.mp4", ImageFormat::Png, 95).unwrap();

        assert!(!payload.is_image);
        assert_eq!(payload.content_type, "video/mp4");
        assert_eq!(payload.data, tensor.to_bytes());
    }

    #[test]
    fn test_grayscale_encodes_as_png() {
        let tensor = gradient_tensor(3, 3, 1);
        let payload = prepare_payload(&tensor, "g.png", ImageFormat::Png, 95).unwrap();
        let decoded = image::load_from_memory(&payload.data).unwrap();
        assert_eq!(decoded.to_luma8().into_raw(), tensor.to_bytes());
    }

    #[test]
    fn test_load_image_tensor_nonexistent_file() {
        let result = load_image_tensor(Path::new("nonexistent_file.png"));
        assert!(result.is_err(), "Should fail for nonexistent file");
    }

    #[test]
    fn test_load_image_tensor_reads_written_png() {
        let test_file_path = std::env::temp_dir().join("oss_uploader_load_test.png");
        let tensor = gradient_tensor(4, 2, 3);
        let payload = prepare_payload(&tensor, "x.png", ImageFormat::Png, 95).unwrap();
        std::fs::write(&test_file_path, &payload.data).unwrap();

        let loaded = load_image_tensor(&test_file_path);
        let _ = std::fs::remove_file(&test_file_path);

        let loaded = loaded.unwrap();
        assert_eq!((loaded.width(), loaded.height(), loaded.channels()), (4, 2, 3));
        let restored: Vec<u8> = loaded
            .samples()
            .iter()
            .map(|v| (v * 255.0).round() as u8)
            .collect();
        assert_eq!(restored, tensor.to_bytes());
    }
}
