//! Filesystem catalog of available LoRA weight files, the listing a picker
//! widget consumes: relative paths with `/` separators, sorted, with the
//! "None" sentinel available at the head for "no file picked".

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Picker sentinel for "no file picked".
pub const NONE_SENTINEL: &str = "None";

/// Extensions recognized as LoRA weight files.
pub const WEIGHT_EXTENSIONS: &[&str] = &["safetensors", "ckpt", "pt"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("lora directory not found: {0}")]
    RootMissing(PathBuf),
    #[error("failed to read lora directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Default LoRA search root under the platform data directory.
pub fn default_lora_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    base.join("loralist").join("loras")
}

#[derive(Debug, Clone, Serialize)]
pub struct LoraCatalog {
    root: PathBuf,
    files: Vec<String>,
}

impl LoraCatalog {
    /// Scans `root` recursively for weight files. Unreadable subdirectories
    /// are skipped; only a missing or unreadable root is an error.
    pub fn scan(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CatalogError::RootMissing(root));
        }
        let mut files = Vec::new();
        collect(&root, &root, &mut files)?;
        files.sort();
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The listing a picker shows: the "None" sentinel, then every file.
    pub fn picker_items(&self) -> Vec<String> {
        let mut items = Vec::with_capacity(self.files.len() + 1);
        items.push(NONE_SENTINEL.to_string());
        items.extend(self.files.iter().cloned());
        items
    }

    /// Case-insensitive substring filter over the relative paths.
    pub fn filter(&self, needle: &str) -> Vec<&str> {
        let needle = needle.to_lowercase();
        self.files
            .iter()
            .filter(|f| f.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), CatalogError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            // Skip subtrees we cannot read rather than failing the scan.
            if collect(root, &path, out).is_err() {
                continue;
            }
        } else if is_weight_file(&path) {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(normalize(rel));
            }
        }
    }
    Ok(())
}

fn is_weight_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .is_some_and(|ext| WEIGHT_EXTENSIONS.contains(&ext.as_str()))
}

// Relative paths are joined with `/` regardless of host separator so the
// listing matches the persisted lora_name convention.
fn normalize(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, File};

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    fn sample_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        create_dir_all(dir.path().join("styles")).unwrap();
        create_dir_all(dir.path().join("characters/fantasy")).unwrap();
        touch(&dir.path().join("base.safetensors"));
        touch(&dir.path().join("styles/ink.safetensors"));
        touch(&dir.path().join("styles/notes.txt"));
        touch(&dir.path().join("characters/fantasy/elf.ckpt"));
        dir
    }

    #[test]
    fn test_scan_finds_weight_files_with_forward_slashes() {
        let dir = sample_root();
        let catalog = LoraCatalog::scan(dir.path()).unwrap();
        assert_eq!(
            catalog.files(),
            &[
                "base.safetensors".to_string(),
                "characters/fantasy/elf.ckpt".to_string(),
                "styles/ink.safetensors".to_string(),
            ]
        );
    }

    #[test]
    fn test_non_weight_files_ignored() {
        let dir = sample_root();
        let catalog = LoraCatalog::scan(dir.path()).unwrap();
        assert!(!catalog.files().iter().any(|f| f.ends_with(".txt")));
    }

    #[test]
    fn test_picker_items_lead_with_none() {
        let dir = sample_root();
        let catalog = LoraCatalog::scan(dir.path()).unwrap();
        let items = catalog.picker_items();
        assert_eq!(items[0], NONE_SENTINEL);
        assert_eq!(items.len(), catalog.len() + 1);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let dir = sample_root();
        let catalog = LoraCatalog::scan(dir.path()).unwrap();
        assert_eq!(catalog.filter("INK"), vec!["styles/ink.safetensors"]);
        assert!(catalog.filter("missing").is_empty());
    }

    #[test]
    fn test_missing_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = LoraCatalog::scan(&missing).unwrap_err();
        assert!(matches!(err, CatalogError::RootMissing(_)));
    }
}
