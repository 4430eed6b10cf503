//! Device bitmap preparation
//!
//! The receipt is composed landscape; the printer feeds portrait. The
//! transform resizes to the device footprint, rotates 90° counter-clockwise
//! and thresholds to 1 bit per pixel.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use tracing::{info, instrument};

use crate::error::{PrintError, PrintResult};

/// Device footprint and threshold of the device bitmap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintImageSpec {
    /// Nominal printable width in dots (80mm paper)
    pub nominal_width: u32,
    /// Oversampling factor applied to the nominal width
    pub scale: u32,
    pub paper_width_mm: f64,
    pub paper_length_mm: f64,
    /// Luminance strictly above this is white
    pub threshold: u8,
}

impl Default for PrintImageSpec {
    fn default() -> Self {
        Self {
            nominal_width: 576,
            scale: 4,
            paper_width_mm: 80.0,
            paper_length_mm: 180.0,
            threshold: 200,
        }
    }
}

impl PrintImageSpec {
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Portrait width of the device bitmap
    pub fn target_width(&self) -> u32 {
        self.nominal_width * self.scale.max(1)
    }

    /// Portrait height of the device bitmap, aspect-locked to the paper
    pub fn target_height(&self) -> u32 {
        (self.target_width() as f64 * self.paper_length_mm / self.paper_width_mm).round() as u32
    }

    /// Resize, rotate and threshold a rendered receipt
    pub fn transform(&self, image: &DynamicImage) -> Bitmap {
        let gray = image.to_luma8();

        // Landscape footprint first, the rotation turns it into the feed direction
        let resized = imageops::resize(
            &gray,
            self.target_height(),
            self.target_width(),
            FilterType::Lanczos3,
        );
        let rotated = imageops::rotate270(&resized);

        Bitmap::from_luma(&rotated, self.threshold)
    }
}

/// Binary threshold: `p > level` becomes white, everything else black
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
    }
    out
}

/// Packed 1-bit image, MSB first, a set bit is a black dot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    row_bytes: usize,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn from_luma(image: &GrayImage, level: u8) -> Self {
        let (width, height) = image.dimensions();
        let row_bytes = width.div_ceil(8) as usize;
        let mut data = vec![0u8; row_bytes * height as usize];

        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0[0] <= level {
                let idx = y as usize * row_bytes + (x / 8) as usize;
                data[idx] |= 0x80 >> (x % 8);
            }
        }

        Self {
            width,
            height,
            row_bytes,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_black(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.row_bytes + (x / 8) as usize;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }

    /// Expand back to an 8-bit image (0 / 255)
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_black(x, y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    /// Encode as a 1 bpp palettized BMP
    pub fn to_bmp(&self) -> Vec<u8> {
        const FILE_HEADER: u32 = 14;
        const INFO_HEADER: u32 = 40;
        const PALETTE: u32 = 8;
        // 203 dpi in dots per metre
        const DOTS_PER_METRE: i32 = 7992;

        let stride = (self.width as usize).div_ceil(32) * 4;
        let pixel_bytes = (stride * self.height as usize) as u32;
        let offset = FILE_HEADER + INFO_HEADER + PALETTE;

        let mut out = Vec::with_capacity((offset + pixel_bytes) as usize);

        // BITMAPFILEHEADER
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&(offset + pixel_bytes).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());

        // BITMAPINFOHEADER
        out.extend_from_slice(&INFO_HEADER.to_le_bytes());
        out.extend_from_slice(&(self.width as i32).to_le_bytes());
        out.extend_from_slice(&(self.height as i32).to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&pixel_bytes.to_le_bytes());
        out.extend_from_slice(&DOTS_PER_METRE.to_le_bytes());
        out.extend_from_slice(&DOTS_PER_METRE.to_le_bytes());
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());

        // Palette: index 0 white, index 1 black (matches the packed bits)
        out.extend_from_slice(&[255, 255, 255, 0]);
        out.extend_from_slice(&[0, 0, 0, 0]);

        // Rows bottom-up, padded to 4 bytes
        let padding = stride - self.row_bytes;
        for y in (0..self.height as usize).rev() {
            let start = y * self.row_bytes;
            out.extend_from_slice(&self.data[start..start + self.row_bytes]);
            out.extend(std::iter::repeat_n(0u8, padding));
        }

        out
    }

    pub fn save_bmp(&self, path: &Path) -> PrintResult<()> {
        std::fs::write(path, self.to_bmp())?;
        Ok(())
    }
}

/// `shot_X.png` -> `shot_X_print.bmp` in the same directory
pub fn device_bitmap_path(receipt: &Path) -> PathBuf {
    let stem = receipt
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "receipt".to_string());
    receipt.with_file_name(format!("{}_print.bmp", stem))
}

/// Build the device bitmap next to the rendered receipt
///
/// Returns the path of the written bitmap. The receipt itself is untouched.
#[instrument(skip(spec), fields(receipt = %receipt.display()))]
pub fn prepare_device_bitmap(receipt: &Path, spec: &PrintImageSpec) -> PrintResult<PathBuf> {
    if !receipt.exists() {
        return Err(PrintError::NotFound(receipt.to_path_buf()));
    }

    let image = image::open(receipt)?;
    let bitmap = spec.transform(&image);
    let target = device_bitmap_path(receipt);
    bitmap.save_bmp(&target)?;

    info!(
        width = bitmap.width(),
        height = bitmap.height(),
        path = %target.display(),
        "Device bitmap written"
    );
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]))
    }

    #[test]
    fn test_target_footprint() {
        let spec = PrintImageSpec::default();
        assert_eq!(spec.target_width(), 2304);
        assert_eq!(spec.target_height(), 5184);

        let spec = spec.with_scale(1);
        assert_eq!(spec.target_width(), 576);
        assert_eq!(spec.target_height(), 1296);
    }

    #[test]
    fn test_threshold_is_idempotent() {
        let once = threshold(&gradient(64, 48), 200);
        let twice = threshold(&once, 200);
        assert_eq!(once, twice);
        assert!(once.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_threshold_boundary() {
        let img = GrayImage::from_raw(3, 1, vec![200, 201, 0]).unwrap();
        let out = threshold(&img, 200);
        assert_eq!(out.as_raw(), &vec![0, 255, 0]);
    }

    #[test]
    fn test_bitmap_matches_threshold() {
        let src = gradient(37, 11);
        let bitmap = Bitmap::from_luma(&src, 200);
        assert_eq!(bitmap.to_luma(), threshold(&src, 200));
    }

    #[test]
    fn test_rotation_is_counter_clockwise() {
        // Landscape receipt with a dark block in its top-left corner
        let mut receipt = GrayImage::from_pixel(1296, 576, Luma([255]));
        for y in 0..60 {
            for x in 0..60 {
                receipt.put_pixel(x, y, Luma([0]));
            }
        }

        let spec = PrintImageSpec::default().with_scale(1);
        let bitmap = spec.transform(&DynamicImage::ImageLuma8(receipt));

        assert_eq!((bitmap.width(), bitmap.height()), (576, 1296));
        // Top-left ends up bottom-left
        assert!(bitmap.is_black(20, 1275));
        assert!(!bitmap.is_black(555, 20));
        assert!(!bitmap.is_black(20, 20));
    }

    #[test]
    fn test_bmp_decodes_to_same_pixels() {
        let src = threshold(&gradient(45, 9), 128);
        let bitmap = Bitmap::from_luma(&src, 128);

        let decoded = image::load_from_memory(&bitmap.to_bmp()).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (45, 9));
        assert_eq!(decoded, src);
    }

    #[test]
    fn test_device_bitmap_path() {
        let path = device_bitmap_path(Path::new("/tmp/images/shot_20240101_1.png"));
        assert_eq!(path, PathBuf::from("/tmp/images/shot_20240101_1_print.bmp"));
    }

    #[test]
    fn test_prepare_missing_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let result = prepare_device_bitmap(&dir.path().join("nope.png"), &PrintImageSpec::default());
        assert!(matches!(result, Err(PrintError::NotFound(_))));
    }

    #[test]
    fn test_prepare_writes_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let receipt = dir.path().join("shot_1.png");
        GrayImage::from_pixel(1296, 576, Luma([255]))
            .save(&receipt)
            .unwrap();

        let spec = PrintImageSpec::default().with_scale(1);
        let out = prepare_device_bitmap(&receipt, &spec).unwrap();

        assert_eq!(out, dir.path().join("shot_1_print.bmp"));
        let decoded = image::open(&out).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (576, 1296));
        assert!(receipt.exists());
    }
}
