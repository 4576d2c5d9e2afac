use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use log::{debug, info, warn};

use crate::pipeline::Category;
use crate::sniff::{MediaType, MediaTypeSniffer};

/// Video containers sorted by orientation
pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mxf", "mov", "webm", "m4v", "h264", "mkv"];
/// Still images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
/// Audio, only counted by the duration summary
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aif"];

/// Which files a run picks up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Videos and images, for sorting
    Sort,
    /// Videos and audio, for the duration summary
    Duration,
}

impl ScanMode {
    fn accepts(&self, path: &Path) -> bool {
        match self {
            ScanMode::Sort => has_extension(path, VIDEO_EXTENSIONS) || has_extension(path, IMAGE_EXTENSIONS),
            ScanMode::Duration => has_extension(path, VIDEO_EXTENSIONS) || has_extension(path, AUDIO_EXTENSIONS),
        }
    }
}

/// A file selected for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub media_type: MediaType,
}

/// Case-insensitive extension check
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Expand file and directory arguments into a sorted, de-duplicated list of accepted files
///
/// Directories contribute their immediate files, or everything below them when
/// `recursive` is set. A recursive walk never enters the category directories a
/// previous run created.
pub fn collect_media(inputs: &[PathBuf], mode: ScanMode, recursive: bool) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();

    for input in inputs {
        if input.is_dir() {
            info!("Scanning directory: {}", input.display());
            let max_depth = if recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(input)
                .follow_links(false)
                .max_depth(max_depth)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_category_dir(e.path()));

            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        warn!("Error reading directory entry: {}", e);
                        continue;
                    }
                };
                let path = entry.path();
                if entry.file_type().is_file() && mode.accepts(path) {
                    debug!("Found media file: {}", path.display());
                    found.insert(absolute(path));
                }
            }
        } else if input.is_file() {
            if mode.accepts(input) {
                found.insert(absolute(input));
            } else {
                debug!("Not an accepted format: {}", input.display());
            }
        } else {
            warn!("Path does not exist: {}", input.display());
        }
    }

    info!("Scan complete: {} accepted file(s)", found.len());
    found.into_iter().collect()
}

/// Attach a sniffed media type to each path
pub fn sniff_all(paths: Vec<PathBuf>, sniffer: &dyn MediaTypeSniffer) -> Vec<MediaFile> {
    paths
        .into_iter()
        .map(|path| {
            let media_type = sniffer.sniff(&path);
            MediaFile { path, media_type }
        })
        .collect()
}

fn is_category_dir(path: &Path) -> bool {
    path.is_dir()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|name| Category::ROUTED.iter().any(|c| c.dir_name() == Some(name)))
            .unwrap_or(false)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
