use std::path::Path;
use anyhow::{Context, Result};

use crate::scan::{has_extension, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// Coarse media type, picked before any probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Image,
    Unknown,
}

/// Decides which classification branch a file takes
pub trait MediaTypeSniffer: Send + Sync {
    fn sniff(&self, path: &Path) -> MediaType;
}

/// MIME guess from the file name, falling back to the accepted extension lists
///
/// Containers such as `.mxf` or raw `.h264` streams have no `video/*` MIME type
/// but are still sorted as video.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeSniffer;

impl MediaTypeSniffer for MimeSniffer {
    fn sniff(&self, path: &Path) -> MediaType {
        let by_mime = mime_guess::from_path(path)
            .iter()
            .find_map(|mime| match mime.type_().as_str() {
                "video" => Some(MediaType::Video),
                "image" => Some(MediaType::Image),
                _ => None,
            });

        by_mime.unwrap_or_else(|| {
            if has_extension(path, VIDEO_EXTENSIONS) {
                MediaType::Video
            } else if has_extension(path, IMAGE_EXTENSIONS) {
                MediaType::Image
            } else {
                MediaType::Unknown
            }
        })
    }
}

/// The still-image dimension collaborator
pub trait ImageInspector: Send + Sync {
    /// Pixel `(width, height)` of the image at `path`
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;
}

/// Reads dimensions from the image header with the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateInspector;

impl ImageInspector for ImageCrateInspector {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        image::image_dimensions(path)
            .with_context(|| format!("Failed to read image dimensions: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sniff_common_types() {
        let sniffer = MimeSniffer;
        assert_eq!(sniffer.sniff(Path::new("/media/clip.mp4")), MediaType::Video);
        assert_eq!(sniffer.sniff(Path::new("/media/clip.MOV")), MediaType::Video);
        assert_eq!(sniffer.sniff(Path::new("holiday.mkv")), MediaType::Video);
        assert_eq!(sniffer.sniff(Path::new("photo.JPG")), MediaType::Image);
        assert_eq!(sniffer.sniff(Path::new("scan.png")), MediaType::Image);
    }

    #[test]
    fn test_sniff_extension_fallback() {
        let sniffer = MimeSniffer;
        assert_eq!(sniffer.sniff(Path::new("camera.mxf")), MediaType::Video);
        assert_eq!(sniffer.sniff(Path::new("raw.h264")), MediaType::Video);
    }

    #[test]
    fn test_sniff_unknown() {
        let sniffer = MimeSniffer;
        assert_eq!(sniffer.sniff(Path::new("notes.txt")), MediaType::Unknown);
        assert_eq!(sniffer.sniff(Path::new("README")), MediaType::Unknown);
    }

    #[test]
    fn test_image_dimensions_from_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tall.png");
        image::RgbImage::new(9, 16).save(&path).unwrap();

        assert_eq!(ImageCrateInspector.dimensions(&path).unwrap(), (9, 16));
    }

    #[test]
    fn test_corrupt_image_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        assert!(ImageCrateInspector.dimensions(&path).is_err());
    }
}
