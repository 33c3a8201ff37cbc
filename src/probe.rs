//! Narrow interfaces to the filesystem: image dimensions and folder listings.

use std::ffi::OsStr;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::PackError;

/// Reads the native pixel size of an image file.
pub trait ImageProbe {
    /// Return `(width, height)` in pixels.
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), PackError>;
}

/// Lists the entries of a pack folder.
pub trait DirectoryLister {
    /// Return true when `path` names a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Return the names of the entries directly inside `dir`, excluding `dir`
    /// itself. Order is unspecified; callers sort.
    fn entries(&self, dir: &Path) -> Result<Vec<String>, PackError>;
}

/// [`ImageProbe`] backed by the `image` crate's header decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageHeaderProbe;

impl ImageProbe for ImageHeaderProbe {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), PackError> {
        // Only the header is decoded, not the pixel data.
        image::image_dimensions(path).map_err(|err| PackError::probe(path, err))
    }
}

/// [`DirectoryLister`] over the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn entries(&self, dir: &Path) -> Result<Vec<String>, PackError> {
        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.map_err(|err| PackError::probe(dir, err))?;
            match entry.file_name().to_str() {
                Some(name) => names.push(name.to_string()),
                None => {
                    tracing::warn!(
                        "skipping non UTF-8 entry {} in pack folder",
                        entry.path().display()
                    );
                }
            }
        }
        Ok(names)
    }
}

/// Return true when the file extension is an image type the host can render.
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(OsStr::to_str) {
        Some(ext) => matches!(
            ext.to_ascii_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "gif" | "tif" | "tiff" | "webp" | "ico"
        ),
        None => false,
    }
}
