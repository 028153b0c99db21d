//! Shrinks photos so they fit the recognition service's upload limits.

use crate::config::PreprocessConfig;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub max_size_kb: u64,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self::from(&PreprocessConfig::default())
    }
}

impl From<&PreprocessConfig> for PreprocessOptions {
    fn from(cfg: &PreprocessConfig) -> Self {
        Self {
            max_size_kb: cfg.max_size_kb,
            max_dimension: cfg.max_dimension,
            jpeg_quality: cfg.jpeg_quality,
        }
    }
}

/// Recompresses the image in place when it is larger than `max_size_kb`.
///
/// Never fails: on any error the file is left as it was and the same path
/// is returned so recognition can still try the original.
pub fn prepare(path: &Path, opts: &PreprocessOptions) -> PathBuf {
    match compress_in_place(path, opts) {
        Ok(Some((before, after))) => {
            info!(image = %path.display(), before, after, "image compressed");
        }
        Ok(None) => {
            debug!(image = %path.display(), "image within size limit");
        }
        Err(e) => {
            warn!(image = %path.display(), error = %e, "image compression failed, using original");
        }
    }
    path.to_path_buf()
}

/// Returns the sizes before and after, or `None` if nothing had to be done.
fn compress_in_place(path: &Path, opts: &PreprocessOptions) -> anyhow::Result<Option<(u64, u64)>> {
    let before = fs::metadata(path)?.len();
    if before <= opts.max_size_kb * 1024 {
        return Ok(None);
    }

    let img = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let rgb = shrink(DynamicImage::ImageRgb8(img.to_rgb8()), opts.max_dimension);

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, opts.jpeg_quality).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    fs::write(path, &buf)?;
    Ok(Some((before, buf.len() as u64)))
}

fn shrink(img: DynamicImage, max_dimension: u32) -> image::RgbImage {
    if img.width() > max_dimension || img.height() > max_dimension {
        img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
            .to_rgb8()
    } else {
        img.to_rgb8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    /// Smooth gradient with a little deterministic noise: large as PNG, small as JPEG.
    fn noisy_photo(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let n = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729)).wrapping_mul(2_654_435_761) >> 29;
            let r = ((x * 255 / width) as u8).saturating_add(n as u8);
            let g = ((y * 255 / height) as u8).saturating_add((n >> 1) as u8);
            Rgba([r, g, 128, 200])
        })
    }

    #[test]
    fn small_files_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        RgbaImage::from_pixel(10, 10, Rgba([1, 2, 3, 255]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        let original = fs::read(&path).unwrap();

        let out = prepare(&path, &PreprocessOptions::default());
        assert_eq!(out, path);
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn large_photos_are_downscaled_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        noisy_photo(2400, 1200)
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        let opts = PreprocessOptions {
            max_size_kb: 1024,
            ..PreprocessOptions::default()
        };
        assert!(fs::metadata(&path).unwrap().len() > opts.max_size_kb * 1024);

        let out = prepare(&path, &opts);
        assert_eq!(out, path);
        let first = fs::read(&path).unwrap();
        assert!(first.len() as u64 <= opts.max_size_kb * 1024);

        let decoded = image::load_from_memory(&first).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1600, 800));
        assert_eq!(decoded.color(), ColorType::Rgb8);

        prepare(&path, &opts);
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn undecodable_files_fall_back_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        let junk = vec![0x42u8; 4096];
        fs::write(&path, &junk).unwrap();
        let opts = PreprocessOptions {
            max_size_kb: 1,
            ..PreprocessOptions::default()
        };

        let out = prepare(&path, &opts);
        assert_eq!(out, path);
        assert_eq!(fs::read(&path).unwrap(), junk);
    }

    #[test]
    fn missing_file_returns_path() {
        let path = Path::new("/no/such/photo.jpg");
        assert_eq!(prepare(path, &PreprocessOptions::default()), path);
    }
}
