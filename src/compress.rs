//! NoteVault - Compression & Backup Manager
//!
//! Optionally recompresses images before encryption, keeping the untouched
//! original under a marker-suffixed backup path so it can be restored when
//! compression is later disabled.

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};

use crate::error::VaultResult;
use crate::settings::VaultOptions;
use crate::store::BinaryStore;

/// Marker token spliced into backup file names
pub const BACKUP_MARKER: &str = "__backup__";

/// JPEG quality steps tried until the output fits `max_compressed_bytes`
const QUALITY_STEPS: [u8; 5] = [85, 75, 65, 50, 35];

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];

/// Backup path: the marker goes immediately before the final `.` of the
/// file name. Paths without an extension get the marker appended.
pub fn backup_path(path: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) => {
            let dot = name_start + dot;
            format!("{}{}{}", &path[..dot], BACKUP_MARKER, &path[dot..])
        }
        None => format!("{path}{BACKUP_MARKER}"),
    }
}

pub fn is_backup_path(path: &str) -> bool {
    path.contains(BACKUP_MARKER)
}

fn extension(path: &str) -> Option<String> {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    path[name_start..]
        .rfind('.')
        .map(|dot| path[name_start + dot + 1..].to_ascii_lowercase())
}

pub fn is_image(path: &str) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_video(path: &str) -> bool {
    extension(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Long screenshots keep their full resolution; capping the long edge of a
/// scrolled page capture would make the text unreadable.
pub fn is_long_screenshot(width: u32, height: u32, ratio: f32) -> bool {
    width > 0 && height as f32 / width as f32 >= ratio
}

/// Recompress an image to JPEG, capping dimensions unless the image is a
/// long screenshot, then stepping quality down until the output fits the
/// configured size bound. Best effort: the smallest attempt is returned even
/// if it still exceeds the bound.
pub fn compress_image(data: &[u8], options: &VaultOptions) -> VaultResult<Vec<u8>> {
    let img = image::load_from_memory(data)?;
    let (width, height) = img.dimensions();

    let capped = if is_long_screenshot(width, height, options.long_screenshot_ratio)
        || width.max(height) <= options.max_dimension
    {
        img
    } else {
        img.resize(options.max_dimension, options.max_dimension, FilterType::Lanczos3)
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(capped.to_rgb8());

    let mut best = Vec::new();
    for quality in QUALITY_STEPS {
        let mut output = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut output), quality);
        rgb.write_with_encoder(encoder)?;

        if best.is_empty() || output.len() < best.len() {
            best = output;
        }
        if best.len() <= options.max_compressed_bytes {
            break;
        }
    }

    Ok(best)
}

/// Backup bookkeeping over a binary store.
pub struct BackupManager<'a> {
    store: &'a dyn BinaryStore,
}

impl<'a> BackupManager<'a> {
    pub fn new(store: &'a dyn BinaryStore) -> Self {
        Self { store }
    }

    pub fn has_backup(&self, path: &str) -> bool {
        self.store.exists(&backup_path(path))
    }

    /// Compress `data`, move the original to its backup path and write the
    /// compressed bytes at the canonical path. Returns the compressed bytes.
    pub fn compress_to_backup(
        &self,
        path: &str,
        data: &[u8],
        options: &VaultOptions,
    ) -> VaultResult<Vec<u8>> {
        let compressed = compress_image(data, options)?;
        self.store.rename(path, &backup_path(path))?;
        self.store.write_binary(path, &compressed)?;
        log::info!(
            "compressed {path}: {} -> {} bytes, original kept as backup",
            data.len(),
            compressed.len()
        );
        Ok(compressed)
    }

    /// If a backup exists for `path`, delete the current file and move the
    /// backup back into place. Returns whether a restore happened.
    pub fn restore_backup_if_present(&self, path: &str) -> VaultResult<bool> {
        let backup = backup_path(path);
        if !self.store.exists(&backup) {
            return Ok(false);
        }
        self.store.delete(path)?;
        self.store.rename(&backup, path)?;
        log::info!("restored {path} from backup");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use tempfile::tempdir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_backup_path_splicing() {
        assert_eq!(backup_path("1.jpg"), "1__backup__.jpg");
        assert_eq!(backup_path("media/shot.final.png"), "media/shot.final__backup__.png");
        assert_eq!(backup_path("dir.v2/noext"), "dir.v2/noext__backup__");
        assert!(is_backup_path("1__backup__.jpg"));
        assert!(!is_backup_path("1.jpg"));
    }

    #[test]
    fn test_extension_classification() {
        assert!(is_image("media/photo.JPG"));
        assert!(is_image("a.webp"));
        assert!(!is_image("clip.mp4"));
        assert!(is_video("clip.mp4"));
        assert!(!is_video("note.md"));
        assert!(!is_image("dir.v2/noext"));
    }

    #[test]
    fn test_long_screenshot_heuristic() {
        assert!(is_long_screenshot(400, 1600, 3.0));
        assert!(!is_long_screenshot(1600, 400, 3.0));
        assert!(!is_long_screenshot(1000, 1500, 3.0));
        assert!(!is_long_screenshot(0, 1500, 3.0));
    }

    #[test]
    fn test_compress_caps_dimensions() {
        let mut options = VaultOptions::default();
        options.max_dimension = 640;
        let compressed = compress_image(&png_bytes(2560, 1440), &options).unwrap();

        let img = image::load_from_memory(&compressed).unwrap();
        let (w, h) = img.dimensions();
        assert!(w <= 640 && h <= 640);
        assert_eq!(image::guess_format(&compressed).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_long_screenshot_skips_cap() {
        let mut options = VaultOptions::default();
        options.max_dimension = 640;
        let compressed = compress_image(&png_bytes(400, 2000), &options).unwrap();

        let img = image::load_from_memory(&compressed).unwrap();
        assert_eq!(img.dimensions(), (400, 2000));
    }

    #[test]
    fn test_backup_roundtrip() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let manager = BackupManager::new(&store);

        let original = png_bytes(1200, 900);
        store.write_binary("1.png", &original).unwrap();

        let options = VaultOptions::default();
        manager.compress_to_backup("1.png", &original, &options).unwrap();

        assert!(manager.has_backup("1.png"));
        assert_eq!(store.read_binary("1__backup__.png").unwrap(), original);
        assert_ne!(store.read_binary("1.png").unwrap(), original);

        assert!(manager.restore_backup_if_present("1.png").unwrap());
        assert!(!manager.has_backup("1.png"));
        assert_eq!(store.read_binary("1.png").unwrap(), original);

        // Nothing left to restore
        assert!(!manager.restore_backup_if_present("1.png").unwrap());
    }
}
