//! Real file system access.

use std::path::{Path, PathBuf};

use super::FileLocator;

/// [`FileLocator`] backed by the local disk.
#[derive(Debug, Clone, Default)]
pub struct DiskFiles {
    compatibility_folder: PathBuf,
}

impl DiskFiles {
    /// Disk locator falling back to `compatibility_folder` for stock images.
    pub fn new(compatibility_folder: impl Into<PathBuf>) -> Self {
        Self {
            compatibility_folder: compatibility_folder.into(),
        }
    }
}

impl FileLocator for DiskFiles {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn combine_path(&self, base: &Path, relative: &Path) -> PathBuf {
        let relative = normalize_separators(relative);
        if relative.is_absolute() {
            return relative;
        }
        let direct = base.join(&relative);
        if direct.exists() {
            return direct;
        }
        // Panel files written on Windows rarely match file name case
        find_case_insensitive(base, &relative).unwrap_or(direct)
    }

    fn compatibility_file(&self, name: &str) -> PathBuf {
        self.compatibility_folder.join(name)
    }
}

/// Rebuild a reference written with `/` or `\` separators for this platform.
fn normalize_separators(relative: &Path) -> PathBuf {
    let text = relative.to_string_lossy();
    if !text.contains('\\') {
        return relative.to_path_buf();
    }
    let mut path = PathBuf::new();
    if text.starts_with(['/', '\\']) {
        path.push(std::path::MAIN_SEPARATOR_STR);
    }
    path.extend(text.split(['/', '\\']).filter(|part| !part.is_empty() && *part != "."));
    path
}

fn find_case_insensitive(base: &Path, relative: &Path) -> Option<PathBuf> {
    let mut current = base.to_path_buf();
    for component in relative.components() {
        let wanted = component.as_os_str().to_string_lossy().to_lowercase();
        let entry = std::fs::read_dir(&current).ok()?.flatten().find(|e| {
            e.file_name().to_string_lossy().to_lowercase() == wanted
        })?;
        current = entry.path();
    }
    Some(current)
}
