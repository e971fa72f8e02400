//! Target path resolution
//!
//! Turns a requested file name (or none) into a path inside the output
//! directory. Resolution is pure string and path composition: no disk access,
//! and no input can make it fail.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::cleaner::is_temp_marker;
use crate::constants::files;

/// Collision-avoiding path resolver for one run
#[derive(Debug)]
pub struct PathResolver {
    root: PathBuf,
    issued: Mutex<HashSet<String>>,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            issued: Mutex::new(HashSet::new()),
        }
    }

    /// Output directory paths are resolved into
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keep `name` out of the names handed to downloads
    pub fn reserve(&self, name: &str) {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_lowercase());
    }

    /// Resolve `requested`, synthesizing a photo name when none is given
    pub fn resolve(&self, requested: Option<&str>) -> PathBuf {
        self.resolve_with_extension(requested, files::PHOTO_EXTENSION)
    }

    /// Resolve `requested`, synthesizing a name with `extension` when none is given
    /// or nothing usable is left after sanitizing
    pub fn resolve_with_extension(&self, requested: Option<&str>, extension: &str) -> PathBuf {
        let mut issued = self
            .issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let name = match requested.and_then(sanitize_file_name) {
            Some(name) => disambiguate(&outside_temp_marker(name), &issued),
            None => synthesize(extension, &issued),
        };

        issued.insert(name.to_lowercase());
        self.root.join(name)
    }
}

/// Strip characters the host filesystem rejects; `None` if nothing usable remains
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| !files::FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .collect();

    // Windows drops trailing dots and spaces silently
    let cleaned = cleaned
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    match cleaned {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// `backup.temp` becomes `backup_temp` so the end-of-run sweep leaves it alone
fn outside_temp_marker(name: String) -> String {
    match name.strip_suffix(files::TEMP_MARKER) {
        Some(stem) if is_temp_marker(&name) => format!("{}_temp", stem),
        _ => name,
    }
}

fn disambiguate(name: &str, issued: &HashSet<String>) -> String {
    if !issued.contains(&name.to_lowercase()) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| match &extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        })
        .find(|candidate| !issued.contains(&candidate.to_lowercase()))
        .unwrap_or_else(|| name.to_string())
}

fn synthesize(extension: &str, issued: &HashSet<String>) -> String {
    loop {
        let stem: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(files::SYNTHESIZED_NAME_LEN)
            .collect::<String>()
            .to_lowercase();
        let name = format!("{}.{}", stem, extension);
        if !issued.contains(&name) {
            return name;
        }
    }
}
