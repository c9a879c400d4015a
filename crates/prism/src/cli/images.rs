//! Image discovery and loading shared by the commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use image::DynamicImage;
use prism_core::caption::ImageInput;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// A decoded image plus the encoded bytes for the captioner.
pub struct LoadedImage {
    pub image: DynamicImage,
    pub input: ImageInput,
}

/// Supported image files at `path`, sorted for deterministic ordering.
///
/// A file path is returned as-is when supported; a directory is walked
/// recursively.
pub fn discover(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_supported(path) {
            vec![path.to_path_buf()]
        } else {
            vec![]
        };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Read and decode an image.
pub fn load(path: &Path) -> anyhow::Result<LoadedImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let image = image::load_from_memory(&bytes)
        .with_context(|| format!("Failed to decode {:?}", path))?;
    let format = extension(path).unwrap_or_else(|| "jpeg".to_string());
    Ok(LoadedImage {
        input: ImageInput::from_bytes(&bytes, &format),
        image,
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}
