//! Filesystem staging primitives: existence checks, creation, removal
//! and collision-safe transfer of files and folders.
//!
//! Destinations are never overwritten unless the caller asks for it.
//! When a destination is occupied the new item is created under a
//! sidestepped name carrying a ` -N` suffix, so repeated archive swaps
//! on the same day keep every prior version.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::StagingError;

/// What a staging operation is acting on. Folders and files differ in
/// how they are created, copied and renamed on collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Folder => "folder",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when `path` exists as the expected kind.
pub fn exists(path: &Path, kind: ItemKind) -> bool {
    debug!(kind = %kind, path = %path.display(), "existence check");
    let found = match kind {
        ItemKind::File => path.is_file(),
        ItemKind::Folder => path.is_dir(),
    };
    if found {
        info!(kind = %kind, path = %path.display(), "present");
    } else {
        warn!(kind = %kind, path = %path.display(), "missing");
    }
    found
}

/// Create an empty file or folder. An occupied destination is either
/// removed first (`overwrite`) or sidestepped to a ` -N` name. Returns
/// the path actually created.
pub fn create(path: &Path, kind: ItemKind, overwrite: bool) -> Result<PathBuf, StagingError> {
    let mut dest = path.to_path_buf();
    if dest.exists() {
        if overwrite {
            remove(&dest, kind)?;
        } else {
            dest = free_sibling(&dest, kind);
            warn!(
                requested = %path.display(),
                using = %dest.display(),
                "destination occupied; creating under a sidestepped name"
            );
        }
    }
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| StagingError::Creation {
                kind,
                path: dest.clone(),
                source,
            })?;
        }
    }
    let made = match kind {
        ItemKind::File => fs::File::create(&dest).map(|_| ()),
        ItemKind::Folder => fs::create_dir(&dest),
    };
    made.map_err(|source| StagingError::Creation {
        kind,
        path: dest.clone(),
        source,
    })?;
    info!(kind = %kind, path = %dest.display(), "created");
    Ok(dest)
}

/// Remove whatever sits at `path`. Attempts file delete, empty-directory
/// delete and recursive delete in that order, returning on the first
/// success. Absent paths are fine.
pub fn remove(path: &Path, kind: ItemKind) -> Result<(), StagingError> {
    if !path.exists() {
        debug!(kind = %kind, path = %path.display(), "already absent");
        return Ok(());
    }
    if fs::remove_file(path).is_ok() {
        info!(kind = %kind, path = %path.display(), "removed file");
        return Ok(());
    }
    if fs::remove_dir(path).is_ok() {
        info!(kind = %kind, path = %path.display(), "removed empty folder");
        return Ok(());
    }
    fs::remove_dir_all(path).map_err(|source| StagingError::Removal {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    info!(kind = %kind, path = %path.display(), "removed folder tree");
    Ok(())
}

/// Transfer an item. `copy` keeps the source in place; otherwise the
/// item is moved (rename, with a copy-and-delete fallback for
/// cross-filesystem moves). Occupied destinations are removed first
/// (`overwrite`) or sidestepped. Returns the destination actually used.
pub fn copy_or_move(
    src: &Path,
    dst: &Path,
    kind: ItemKind,
    copy: bool,
    overwrite: bool,
) -> Result<PathBuf, StagingError> {
    if !exists(src, kind) {
        return Err(StagingError::Transfer {
            kind,
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "transfer source missing"),
        });
    }
    let mut dest = dst.to_path_buf();
    if dest.exists() {
        if overwrite {
            remove(&dest, kind)?;
        } else {
            dest = free_sibling(&dest, kind);
            warn!(
                requested = %dst.display(),
                using = %dest.display(),
                "destination occupied; transferring under a sidestepped name"
            );
        }
    }
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| StagingError::Transfer {
                kind,
                from: src.to_path_buf(),
                to: dest.clone(),
                source,
            })?;
        }
    }

    let result = if copy {
        match kind {
            ItemKind::File => fs::copy(src, &dest).map(|_| ()),
            ItemKind::Folder => copy_dir_recursive(src, &dest),
        }
    } else {
        move_item(src, &dest)
    };
    result.map_err(|source| StagingError::Transfer {
        kind,
        from: src.to_path_buf(),
        to: dest.clone(),
        source,
    })?;

    info!(
        kind = %kind,
        from = %src.display(),
        to = %dest.display(),
        copied = copy,
        "transferred"
    );
    Ok(dest)
}

/// Next collision name for an item. A trailing ` -<digits>` marker is
/// incremented; any other name gets ` -1` appended. File extensions are
/// preserved: `collision.txt` becomes `collision -1.txt`.
pub fn collision_name(name: &str, kind: ItemKind) -> String {
    let (stem, ext) = match kind {
        ItemKind::File => {
            let path = Path::new(name);
            match (path.file_stem(), path.extension()) {
                (Some(stem), Some(ext)) => (
                    stem.to_string_lossy().into_owned(),
                    Some(ext.to_string_lossy().into_owned()),
                ),
                _ => (name.to_string(), None),
            }
        }
        ItemKind::Folder => (name.to_string(), None),
    };

    let bumped = match stem.rsplit_once(" -") {
        Some((head, digits))
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) =>
        {
            match digits.parse::<u64>() {
                Ok(n) => format!("{head} -{}", n + 1),
                Err(_) => format!("{stem} -1"),
            }
        }
        _ => format!("{stem} -1"),
    };

    match ext {
        Some(ext) => format!("{bumped}.{ext}"),
        None => bumped,
    }
}

/// First sibling of `path` that does not exist yet, applying the
/// collision rule as many times as needed.
pub fn free_sibling(path: &Path, kind: ItemKind) -> PathBuf {
    let mut candidate = path.to_path_buf();
    while candidate.exists() {
        let name = candidate
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        candidate = candidate.with_file_name(collision_name(&name, kind));
    }
    candidate
}

fn move_item(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Rename cannot cross filesystems; fall back to copy + delete.
            if src.is_dir() {
                copy_dir_recursive(src, dst)?;
                fs::remove_dir_all(src)
            } else {
                fs::copy(src, dst)?;
                fs::remove_file(src)
            }
        }
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry.path().strip_prefix(src).unwrap_or_else(|_| entry.path());
        if rel.as_os_str().is_empty() {
            fs::create_dir_all(dst)?;
            continue;
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
