use chrono::Local;

use crate::config::DEFAULT_DEST_PATH;
use crate::image_processor::{is_image_extension, split_extension, ImageFormat};

pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// Local time as `YYYYMMDD_HHMMSS_ffffff`
pub fn timestamp_now() -> String {
    Local::now().format("%Y%m%d_%H%M%S_%6f").to_string()
}

/// Derive one object key per image from a (possibly multi-line) template
pub fn prepare_dest_paths(template: &str, num_images: usize, format: ImageFormat) -> Vec<String> {
    prepare_dest_paths_with_clock(template, num_images, format, timestamp_now)
}

/// Same as [`prepare_dest_paths`], reading the timestamp from `clock`. The
/// clock is called once per key that contains the placeholder.
pub fn prepare_dest_paths_with_clock<F>(
    template: &str,
    num_images: usize,
    format: ImageFormat,
    mut clock: F,
) -> Vec<String>
where
    F: FnMut() -> String,
{
    let mut fragments: Vec<&str> = template
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if fragments.is_empty() {
        fragments.push(DEFAULT_DEST_PATH);
    }

    expand_fragments(&fragments, num_images)
        .iter()
        .map(|path| process_dest_path(path, format, &mut clock))
        .collect()
}

/// Pair fragments with images one to one; extra images reuse the last
/// fragment with a zero-based `-N` suffix before its extension.
fn expand_fragments(fragments: &[&str], num_images: usize) -> Vec<String> {
    if fragments.len() >= num_images {
        return fragments[..num_images]
            .iter()
            .map(|fragment| fragment.to_string())
            .collect();
    }

    let mut paths: Vec<String> = fragments.iter().map(|f| f.to_string()).collect();
    let last = fragments[fragments.len() - 1];
    let (stem, extension) = split_extension(last);

    for suffix_index in 0..(num_images - fragments.len()) {
        paths.push(format!("{}-{}{}", stem, suffix_index, extension));
    }

    paths
}

/// Fill in the timestamp, force the format's extension on image keys and
/// drop leading slashes
pub fn process_dest_path<F>(dest_path: &str, format: ImageFormat, clock: &mut F) -> String
where
    F: FnMut() -> String,
{
    let mut path = if dest_path.contains(TIMESTAMP_PLACEHOLDER) {
        dest_path.replace(TIMESTAMP_PLACEHOLDER, &clock())
    } else {
        dest_path.to_string()
    };

    let (stem, extension) = split_extension(&path);

    // Non-image extensions are uploaded as-is
    if !extension.is_empty() && !is_image_extension(extension) {
        return path.trim_start_matches('/').to_string();
    }

    let wanted = format.extension();
    if extension.is_empty() {
        path.push_str(wanted);
    } else if !extension.eq_ignore_ascii_case(wanted) {
        path = format!("{}{}", stem, wanted);
    }

    path.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> impl FnMut() -> String {
        let mut calls = 0;
        move || {
            calls += 1;
            format!("20260101_120000_00000{}", calls)
        }
    }

    fn paths(template: &str, n: usize, format: ImageFormat) -> Vec<String> {
        prepare_dest_paths_with_clock(template, n, format, fixed_clock())
    }

    #[test]
    fn test_extra_images_reuse_last_fragment_with_suffix() {
        assert_eq!(
            paths("a.png\nb.png", 3, ImageFormat::Png),
            vec!["a.png", "b.png", "b-0.png"]
        );
        assert_eq!(
            paths("shot.png", 3, ImageFormat::Png),
            vec!["shot.png", "shot-0.png", "shot-1.png"]
        );
    }

    #[test]
    fn test_extra_fragments_are_ignored() {
        assert_eq!(
            paths("a.png\nb.png\nc.png", 2, ImageFormat::Png),
            vec!["a.png", "b.png"]
        );
    }

    #[test]
    fn test_missing_extension_takes_format() {
        assert_eq!(paths("out/img", 1, ImageFormat::Jpeg), vec!["out/img.jpg"]);
        assert_eq!(
            paths("out/img", 2, ImageFormat::Webp),
            vec!["out/img.webp", "out/img-0.webp"]
        );
    }

    #[test]
    fn test_mismatched_extension_is_replaced() {
        assert_eq!(paths("a.png", 1, ImageFormat::Jpeg), vec!["a.jpg"]);
        assert_eq!(paths("a.jpeg", 1, ImageFormat::Jpeg), vec!["a.jpg"]);
        assert_eq!(paths("a.JPG", 1, ImageFormat::Jpeg), vec!["a.JPG"]);
        assert_eq!(paths("a.webp", 1, ImageFormat::Png), vec!["a.png"]);
    }

    #[test]
    fn test_bare_image_extension_name() {
        assert_eq!(paths("out/.png", 1, ImageFormat::Png), vec!["out/.png"]);
        assert_eq!(paths("out/.png", 1, ImageFormat::Jpeg), vec!["out/.jpg"]);
        assert_eq!(
            paths("out/.webp", 2, ImageFormat::Webp),
            vec!["out/.webp", "out/-0.webp"]
        );
    }

    #[test]
    fn test_non_image_extension_kept() {
        assert_eq!(paths("/clip.mp4", 1, ImageFormat::Png), vec!["clip.mp4"]);
        assert_eq!(
            paths("videos/clip.mp4", 2, ImageFormat::Jpeg),
            vec!["videos/clip.mp4", "videos/clip-0.mp4"]
        );
    }

    #[test]
    fn test_leading_slash_and_blank_lines() {
        assert_eq!(
            paths("\n  /a.png  \n\n /b \n", 2, ImageFormat::Png),
            vec!["a.png", "b.png"]
        );
    }

    #[test]
    fn test_empty_template_falls_back_to_default() {
        let result = paths(" \n ", 1, ImageFormat::Png);
        assert_eq!(result, vec!["comfyui/20260101_120000_000001.png"]);
    }

    #[test]
    fn test_zero_images_yield_no_paths() {
        assert!(paths("a.png", 0, ImageFormat::Png).is_empty());
    }

    #[test]
    fn test_each_key_gets_its_own_timestamp() {
        let result = paths("out/{timestamp}.png", 2, ImageFormat::Png);
        assert_eq!(
            result,
            vec![
                "out/20260101_120000_000001.png",
                "out/20260101_120000_000002-0.png"
            ]
        );
    }

    #[test]
    fn test_clock_not_called_without_placeholder() {
        let mut calls = 0;
        let result = prepare_dest_paths_with_clock("a.png\nb.png", 2, ImageFormat::Png, || {
            calls += 1;
            String::new()
        });
        assert_eq!(result.len(), 2);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_count_matches_images_and_keys_are_distinct() {
        for n in 0..6 {
            let result = prepare_dest_paths("comfyui/{timestamp}.png", n, ImageFormat::Png);
            assert_eq!(result.len(), n);
            let mut unique = result.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), n);
        }
    }

    #[test]
    fn test_timestamp_format() {
        let stamp = timestamp_now();
        assert_eq!(stamp.len(), "YYYYMMDD_HHMMSS_ffffff".len());
        let parts: Vec<&str> = stamp.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 6);
        assert!(stamp.replace('_', "").chars().all(|c| c.is_ascii_digit()));
    }
}
