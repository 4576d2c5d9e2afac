use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use log::{debug, warn};
use thiserror::Error;

use crate::pipeline::{ClassificationResult, SkipReason};

/// Why a move did not happen
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("destination already exists: {0}")]
    Collision(PathBuf),
    #[error("permission denied moving to {path}: {source}")]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cross-device copy to {path} failed: {source}")]
    CrossDeviceCopyFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot move to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What happened to one file
#[derive(Debug)]
pub enum RouteOutcome {
    Moved { from: PathBuf, to: PathBuf },
    /// Skipped by classification; the file was not touched
    Left { path: PathBuf, reason: SkipReason },
    /// The move failed; the source is still in place
    Failed { path: PathBuf, reason: RouteError },
}

/// Moves classified files into their category directories
#[derive(Debug, Default)]
pub struct FileRouter {
    destination_root: Option<PathBuf>,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileRouter {
    /// `None` sorts each file into directories next to it
    pub fn new(destination_root: Option<PathBuf>) -> Self {
        Self {
            destination_root,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Category directory for a result, or `None` when it stays put
    pub fn destination_dir(&self, result: &ClassificationResult) -> Option<PathBuf> {
        let name = result.category.dir_name()?;
        let root = match &self.destination_root {
            Some(root) => root.clone(),
            None => result
                .source_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        Some(root.join(name))
    }

    /// Create the category directory if needed and move the file into it
    pub fn route(&self, result: &ClassificationResult) -> RouteOutcome {
        let source = result.source_path.clone();
        let dest_dir = match self.destination_dir(result) {
            Some(dir) => dir,
            None => {
                return RouteOutcome::Left {
                    path: source,
                    reason: result.reason.unwrap_or(SkipReason::UnknownType),
                }
            }
        };

        match move_into(&source, &dest_dir) {
            Ok(to) => RouteOutcome::Moved { from: source, to },
            Err(reason) => RouteOutcome::Failed { path: source, reason },
        }
    }

    /// [`route`](Self::route), holding a lock on the destination directory
    ///
    /// Concurrent callers targeting the same directory run one at a time, so
    /// the first file to arrive wins a name collision.
    pub async fn route_serialized(&self, result: &ClassificationResult) -> RouteOutcome {
        let lock = match self.destination_dir(result) {
            Some(dir) => self.lock_for(dir),
            None => return self.route(result),
        };
        let _guard = lock.lock().await;
        self.route(result)
    }

    fn lock_for(&self, dir: PathBuf) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(dir).or_default().clone()
    }
}

fn move_into(source: &Path, dest_dir: &Path) -> Result<PathBuf, RouteError> {
    let file_name = source.file_name().ok_or_else(|| RouteError::Io {
        path: source.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
    })?;

    // Safe to repeat; an existing directory is fine
    fs::create_dir_all(dest_dir).map_err(|e| RouteError::CreateDir {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    // Any existing entry counts, including a dangling symlink
    let target = dest_dir.join(file_name);
    match fs::symlink_metadata(&target) {
        Ok(_) => return Err(RouteError::Collision(target)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error(target, e)),
    }

    debug!("Moving {} -> {}", source.display(), target.display());
    match fs::rename(source, &target) {
        Ok(()) => Ok(target),
        // Different filesystem: fall back to a verified copy
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("Rename crosses devices, copying instead: {}", source.display());
            copy_then_remove(source, &target)?;
            Ok(target)
        }
        Err(e) => Err(io_error(target, e)),
    }
}

/// Copy without clobbering, verify, then remove the source
///
/// The destination is removed again on any failure, so the only file left is
/// always a complete one.
pub(crate) fn copy_then_remove(source: &Path, target: &Path) -> Result<(), RouteError> {
    let copy_failed = |e: io::Error| RouteError::CrossDeviceCopyFailed {
        path: target.to_path_buf(),
        source: e,
    };

    let mut reader = File::open(source).map_err(copy_failed)?;
    // create_new refuses to clobber anything that appeared since the check
    let mut writer = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(RouteError::Collision(target.to_path_buf()))
        }
        Err(e) => return Err(copy_failed(e)),
    };

    // Copy and flush, then compare against the source length
    let copied = io::copy(&mut reader, &mut writer).and_then(|n| writer.sync_all().map(|_| n));
    let expected = reader.metadata().map(|m| m.len());
    drop(writer);

    let verified = match (copied, expected) {
        (Ok(n), Ok(len)) if n == len => Ok(()),
        (Ok(n), Ok(len)) => Err(io::Error::new(
            io::ErrorKind::Other,
            format!("copied {} of {} bytes", n, len),
        )),
        (Err(e), _) | (_, Err(e)) => Err(e),
    };
    if let Err(e) = verified {
        discard_partial(target);
        return Err(copy_failed(e));
    }

    // Source must go; if it can't, roll back so only one copy remains
    if let Err(e) = fs::remove_file(source) {
        discard_partial(target);
        return Err(io_error(source.to_path_buf(), e));
    }
    Ok(())
}

fn discard_partial(target: &Path) {
    if let Err(e) = fs::remove_file(target) {
        warn!("Failed to remove incomplete copy {}: {}", target.display(), e);
    }
}

fn io_error(path: PathBuf, source: io::Error) -> RouteError {
    if source.kind() == io::ErrorKind::PermissionDenied {
        RouteError::Permission { path, source }
    } else {
        RouteError::Io { path, source }
    }
}
