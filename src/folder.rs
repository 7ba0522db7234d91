//! Folder listing for the command-line front-end.
//!
//! The viewer itself takes its listing from whoever embeds it. The binary
//! needs one too, so this module lists the images directly inside a
//! directory: regular files with a known image extension, sorted by path.
//! Subdirectories are not descended into.

use crate::types::ImageRef;
use std::path::Path;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp", "gif", "bmp"];

/// Images directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<ImageRef>, walkdir::Error> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(ImageRef::from(entry.path()));
        }
    }
    Ok(images)
}

pub fn is_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}
