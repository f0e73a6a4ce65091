//! Image buffer wrapper for captured bitmaps
//!
//! This module provides an `ImageBuffer` wrapper around `image::DynamicImage`
//! that only ever holds one of the two pixel layouts a capture can produce:
//! opaque 24-bit RGB or 32-bit RGBA. Every constructor normalizes into one of
//! them, so code downstream of a capturer never has to match on the dozen
//! formats `DynamicImage` supports.
//!
//! # Examples
//!
//! ```
//! use screenshot_engine::{
//!     capture::{ImageBuffer, PixelFormat},
//!     model::{Point, Rect},
//! };
//!
//! // Start with a transparent canvas and draw an opaque tile into it
//! let mut canvas = ImageBuffer::transparent(200, 100);
//! let tile = ImageBuffer::solid(100, 100, [10, 20, 30]);
//! canvas.draw_image(&tile, Point::new(100, 0));
//!
//! assert_eq!(canvas.pixel_format(), PixelFormat::Rgba32);
//!
//! // Crop back to the tile
//! let cropped = canvas.crop(Rect::new(100, 0, 100, 100)).unwrap();
//! assert_eq!(cropped.dimensions(), (100, 100));
//! ```

use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::{
    error::{CaptureError, CaptureResult},
    model::{Point, Rect},
};

/// Pixel layout of an [`ImageBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Opaque 24-bit RGB
    Rgb24,
    /// 32-bit RGBA with straight alpha
    Rgba32,
}

/// Wrapper around `image::DynamicImage` holding RGB8 or RGBA8 pixels
///
/// Transformation methods either return a new `ImageBuffer` (`crop`,
/// `flatten_onto`, `trim_transparent_border`) or draw into `self`
/// (`draw_image`, `overlay`).
#[derive(Clone, Debug)]
pub struct ImageBuffer {
    inner: DynamicImage,
}

impl ImageBuffer {
    /// Creates a new ImageBuffer from a DynamicImage
    ///
    /// Formats with an alpha channel become RGBA8, everything else RGB8.
    ///
    /// # Examples
    ///
    /// ```
    /// use image::DynamicImage;
    /// use screenshot_engine::capture::{ImageBuffer, PixelFormat};
    ///
    /// let buffer = ImageBuffer::new(DynamicImage::new_luma8(10, 10));
    /// assert_eq!(buffer.pixel_format(), PixelFormat::Rgb24);
    /// ```
    pub fn new(image: DynamicImage) -> Self {
        let inner = match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        Self { inner }
    }

    /// Wraps an opaque RGB image
    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            inner: DynamicImage::ImageRgb8(image),
        }
    }

    /// Wraps an RGBA image
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            inner: DynamicImage::ImageRgba8(image),
        }
    }

    /// Fully transparent RGBA canvas
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::from_rgba(RgbaImage::new(width, height))
    }

    /// Opaque single-colour image
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::from_rgb(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    /// Pixel layout of this buffer
    pub fn pixel_format(&self) -> PixelFormat {
        match self.inner {
            DynamicImage::ImageRgba8(_) => PixelFormat::Rgba32,
            _ => PixelFormat::Rgb24,
        }
    }

    /// Returns true for RGBA buffers
    pub fn has_alpha(&self) -> bool {
        self.pixel_format() == PixelFormat::Rgba32
    }

    /// Crops the image to a rectangle given in image coordinates
    ///
    /// The rectangle must be non-empty and lie within the image.
    ///
    /// # Examples
    ///
    /// ```
    /// use screenshot_engine::{capture::ImageBuffer, model::Rect};
    ///
    /// let img = ImageBuffer::from_test_pattern(1920, 1080);
    /// let cropped = img.crop(Rect::new(100, 100, 800, 600)).unwrap();
    /// assert_eq!(cropped.dimensions(), (800, 600));
    ///
    /// assert!(img.crop(Rect::new(1900, 0, 100, 100)).is_err());
    /// ```
    pub fn crop(&self, rect: Rect) -> CaptureResult<Self> {
        let (img_width, img_height) = self.dimensions();
        let bounds = Rect::new(0, 0, img_width, img_height);

        if !bounds.contains_rect(&rect) {
            return Err(CaptureError::InvalidParameter {
                parameter: "rect".to_string(),
                reason:    format!(
                    "Crop rectangle {} does not fit the {}x{} image",
                    rect, img_width, img_height
                ),
            });
        }

        let cropped = self
            .inner
            .crop_imm(rect.x as u32, rect.y as u32, rect.width, rect.height);
        Ok(Self::new(cropped))
    }

    /// Copies `source` into `self` at `at`, replacing pixels (alpha included)
    ///
    /// Parts of `source` falling outside `self` are clipped.
    pub fn draw_image(&mut self, source: &ImageBuffer, at: Point) {
        let (x, y) = (i64::from(at.x), i64::from(at.y));
        match &mut self.inner {
            DynamicImage::ImageRgba8(canvas) => {
                image::imageops::replace(canvas, &source.to_rgba8(), x, y);
            }
            DynamicImage::ImageRgb8(canvas) => {
                image::imageops::replace(canvas, &source.to_rgb8(), x, y);
            }
            other => {
                let mut canvas = other.to_rgba8();
                image::imageops::replace(&mut canvas, &source.to_rgba8(), x, y);
                *other = DynamicImage::ImageRgba8(canvas);
            }
        }
    }

    /// Alpha-blends `source` over `self` at `at`
    ///
    /// The pixel format of `self` is kept: blending onto an opaque RGB
    /// buffer yields opaque pixels.
    pub fn overlay(&mut self, source: &ImageBuffer, at: Point) {
        let (x, y) = (i64::from(at.x), i64::from(at.y));
        let top = source.to_rgba8();
        match &mut self.inner {
            DynamicImage::ImageRgba8(canvas) => {
                image::imageops::overlay(canvas, &top, x, y);
            }
            other => {
                let mut canvas = other.to_rgba8();
                image::imageops::overlay(&mut canvas, &top, x, y);
                *other = DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8());
            }
        }
    }

    /// Number of exactly solid-black pixels (RGB 0,0,0 and fully opaque)
    pub fn black_pixel_count(&self) -> u64 {
        let count = match &self.inner {
            DynamicImage::ImageRgba8(img) => img
                .as_raw()
                .chunks_exact(4)
                .filter(|px| px[0] == 0 && px[1] == 0 && px[2] == 0 && px[3] == u8::MAX)
                .count(),
            DynamicImage::ImageRgb8(img) => img
                .as_raw()
                .chunks_exact(3)
                .filter(|px| px.iter().all(|&channel| channel == 0))
                .count(),
            other => other
                .to_rgba8()
                .pixels()
                .filter(|px| px.0 == [0, 0, 0, u8::MAX])
                .count(),
        };
        count as u64
    }

    /// Share of solid-black pixels in percent; 0 for an empty image
    pub fn black_percentage(&self) -> f64 {
        let total = self.pixel_count();
        if total == 0 {
            return 0.0;
        }
        self.black_pixel_count() as f64 * 100.0 / total as f64
    }

    /// Blends every pixel onto an opaque background, producing RGB
    pub fn flatten_onto(&self, background: [u8; 3]) -> Self {
        let DynamicImage::ImageRgba8(img) = &self.inner else {
            return self.clone();
        };

        let flattened = RgbImage::from_fn(img.width(), img.height(), |x, y| {
            let px = img.get_pixel(x, y).0;
            let alpha = u32::from(px[3]);
            let blend = |fg: u8, bg: u8| {
                ((u32::from(fg) * alpha + u32::from(bg) * (255 - alpha) + 127) / 255) as u8
            };
            image::Rgb([
                blend(px[0], background[0]),
                blend(px[1], background[1]),
                blend(px[2], background[2]),
            ])
        });
        Self::from_rgb(flattened)
    }

    /// Removes fully transparent rows and columns around the content
    ///
    /// Returns the trimmed image and the offset of its top-left corner inside
    /// `self`. Opaque or fully transparent images come back unchanged with a
    /// zero offset.
    pub fn trim_transparent_border(&self) -> (Self, Point) {
        let DynamicImage::ImageRgba8(img) = &self.inner else {
            return (self.clone(), Point::default());
        };

        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        for (x, y, px) in img.enumerate_pixels() {
            if px.0[3] != 0 {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        if min_x == u32::MAX {
            return (self.clone(), Point::default());
        }

        let content = Rect::new(
            min_x as i32,
            min_y as i32,
            max_x - min_x + 1,
            max_y - min_y + 1,
        );
        if content.width == img.width() && content.height == img.height() {
            return (self.clone(), Point::default());
        }

        let trimmed = Self::from_rgba(
            image::imageops::crop_imm(img, min_x, min_y, content.width, content.height)
                .to_image(),
        );
        (trimmed, content.origin())
    }

    /// Returns the dimensions of the image as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    /// Returns the image width in pixels
    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    /// Returns the image height in pixels
    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Converts the image to RGBA8
    pub fn to_rgba8(&self) -> RgbaImage {
        self.inner.to_rgba8()
    }

    /// Converts the image to RGB8, dropping alpha
    pub fn to_rgb8(&self) -> RgbImage {
        self.inner.to_rgb8()
    }

    /// Returns the raw pixel bytes in the buffer's own layout
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Creates an opaque gradient from blue (top) to cyan (bottom)
    ///
    /// No pixel of the pattern is black, which keeps it neutral for the
    /// quality heuristics.
    pub fn from_test_pattern(width: u32, height: u32) -> Self {
        let img = RgbImage::from_fn(width, height, |_x, y| {
            let ratio = y as f32 / height.max(1) as f32;
            image::Rgb([0, (255.0 * ratio) as u8, 255])
        });
        Self::from_rgb(img)
    }

    /// Returns a reference to the inner DynamicImage
    pub fn inner(&self) -> &DynamicImage {
        &self.inner
    }

    /// Consumes self and returns the inner DynamicImage
    pub fn into_inner(self) -> DynamicImage {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_pixel(img: &ImageBuffer, x: u32, y: u32) -> [u8; 4] {
        img.to_rgba8().get_pixel(x, y).0
    }

    #[test]
    fn test_new_normalizes_formats() {
        let luma = ImageBuffer::new(DynamicImage::new_luma8(4, 4));
        assert_eq!(luma.pixel_format(), PixelFormat::Rgb24);

        let luma_alpha = ImageBuffer::new(DynamicImage::new_luma_a8(4, 4));
        assert_eq!(luma_alpha.pixel_format(), PixelFormat::Rgba32);

        let rgb16 = ImageBuffer::new(DynamicImage::new_rgb16(4, 4));
        assert_eq!(rgb16.pixel_format(), PixelFormat::Rgb24);
        assert!(matches!(rgb16.inner(), DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_dimensions() {
        let img = ImageBuffer::from_test_pattern(1920, 1080);
        assert_eq!(img.dimensions(), (1920, 1080));
        assert_eq!(img.pixel_count(), 1920 * 1080);
    }

    #[test]
    fn test_crop_valid_region() {
        let img = ImageBuffer::from_test_pattern(1920, 1080);
        let cropped = img.crop(Rect::new(460, 240, 1000, 600)).unwrap();
        assert_eq!(cropped.dimensions(), (1000, 600));
    }

    #[test]
    fn test_crop_boundary_check() {
        let img = ImageBuffer::from_test_pattern(1920, 1080);

        assert_eq!(img.crop(Rect::new(0, 0, 1920, 1080)).unwrap().dimensions(), (1920, 1080));
        assert_eq!(img.crop(Rect::new(1820, 980, 100, 100)).unwrap().dimensions(), (100, 100));
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let img = ImageBuffer::from_test_pattern(1920, 1080);

        assert!(img.crop(Rect::new(2000, 1000, 100, 100)).is_err());
        assert!(img.crop(Rect::new(1900, 1000, 200, 200)).is_err());
        assert!(img.crop(Rect::new(-1, 0, 10, 10)).is_err());
        assert!(img.crop(Rect::new(0, 0, 0, 10)).is_err());
    }

    #[test]
    fn test_crop_keeps_alpha() {
        let img = ImageBuffer::transparent(10, 10);
        let cropped = img.crop(Rect::new(2, 2, 4, 4)).unwrap();
        assert_eq!(cropped.pixel_format(), PixelFormat::Rgba32);
    }

    #[test]
    fn test_draw_image_into_transparent_canvas() {
        let mut canvas = ImageBuffer::transparent(20, 10);
        let tile = ImageBuffer::solid(10, 10, [200, 100, 50]);
        canvas.draw_image(&tile, Point::new(10, 0));

        assert_eq!(rgba_pixel(&canvas, 0, 0), [0, 0, 0, 0]);
        assert_eq!(rgba_pixel(&canvas, 9, 9), [0, 0, 0, 0]);
        assert_eq!(rgba_pixel(&canvas, 10, 0), [200, 100, 50, 255]);
        assert_eq!(rgba_pixel(&canvas, 19, 9), [200, 100, 50, 255]);
    }

    #[test]
    fn test_draw_image_clips() {
        let mut canvas = ImageBuffer::solid(10, 10, [1, 1, 1]);
        let tile = ImageBuffer::solid(10, 10, [9, 9, 9]);
        canvas.draw_image(&tile, Point::new(-5, 5));

        assert_eq!(canvas.pixel_format(), PixelFormat::Rgb24);
        assert_eq!(rgba_pixel(&canvas, 4, 5), [9, 9, 9, 255]);
        assert_eq!(rgba_pixel(&canvas, 5, 5), [1, 1, 1, 255]);
        assert_eq!(rgba_pixel(&canvas, 0, 4), [1, 1, 1, 255]);
    }

    #[test]
    fn test_overlay_blends_and_keeps_rgb() {
        let mut base = ImageBuffer::solid(4, 4, [255, 255, 255]);
        let mut cursor = RgbaImage::new(2, 2);
        cursor.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        cursor.put_pixel(1, 1, image::Rgba([0, 0, 0, 0]));
        base.overlay(&ImageBuffer::from_rgba(cursor), Point::new(1, 1));

        assert_eq!(base.pixel_format(), PixelFormat::Rgb24);
        assert_eq!(rgba_pixel(&base, 1, 1), [0, 0, 0, 255]);
        assert_eq!(rgba_pixel(&base, 2, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn test_black_pixel_count_rgb() {
        let mut img = RgbImage::from_pixel(10, 10, image::Rgb([5, 5, 5]));
        for x in 0..10 {
            img.put_pixel(x, 0, image::Rgb([0, 0, 0]));
        }
        let img = ImageBuffer::from_rgb(img);
        assert_eq!(img.black_pixel_count(), 10);
        assert!((img.black_percentage() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_black_pixel_count_ignores_transparent_black() {
        let img = ImageBuffer::transparent(10, 10);
        assert_eq!(img.black_pixel_count(), 0);

        let opaque = ImageBuffer::from_rgba(RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([0, 0, 0, 255]),
        ));
        assert_eq!(opaque.black_pixel_count(), 4);
    }

    #[test]
    fn test_black_pixel_count_near_black_is_not_black() {
        let img = ImageBuffer::solid(3, 3, [0, 0, 1]);
        assert_eq!(img.black_pixel_count(), 0);
    }

    #[test]
    fn test_black_percentage_empty() {
        let img = ImageBuffer::solid(0, 0, [0, 0, 0]);
        assert_eq!(img.black_percentage(), 0.0);
    }

    #[test]
    fn test_flatten_onto_background() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        let flat = ImageBuffer::from_rgba(img).flatten_onto([255, 0, 128]);

        assert_eq!(flat.pixel_format(), PixelFormat::Rgb24);
        assert_eq!(rgba_pixel(&flat, 0, 0), [10, 20, 30, 255]);
        assert_eq!(rgba_pixel(&flat, 1, 0), [255, 0, 128, 255]);
    }

    #[test]
    fn test_flatten_half_alpha() {
        let img = ImageBuffer::from_rgba(RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([0, 0, 0, 128]),
        ));
        let flat = img.flatten_onto([255, 255, 255]);
        let px = rgba_pixel(&flat, 0, 0);
        assert!((126..=128).contains(&px[0]), "got {:?}", px);
    }

    #[test]
    fn test_trim_transparent_border() {
        let mut canvas = ImageBuffer::transparent(20, 20);
        canvas.draw_image(&ImageBuffer::solid(8, 6, [1, 2, 3]), Point::new(5, 7));

        let (trimmed, offset) = canvas.trim_transparent_border();
        assert_eq!(trimmed.dimensions(), (8, 6));
        assert_eq!(offset, Point::new(5, 7));
        assert_eq!(trimmed.black_pixel_count(), 0);
    }

    #[test]
    fn test_trim_opaque_or_empty_is_noop() {
        let opaque = ImageBuffer::solid(5, 5, [1, 1, 1]);
        let (same, offset) = opaque.trim_transparent_border();
        assert_eq!(same.dimensions(), (5, 5));
        assert_eq!(offset, Point::default());

        let empty = ImageBuffer::transparent(5, 5);
        let (same, offset) = empty.trim_transparent_border();
        assert_eq!(same.dimensions(), (5, 5));
        assert_eq!(offset, Point::default());
    }

    #[test]
    fn test_from_test_pattern_has_no_black() {
        let img = ImageBuffer::from_test_pattern(64, 64);
        assert_eq!(img.black_pixel_count(), 0);
        assert_eq!(img.pixel_format(), PixelFormat::Rgb24);
    }

    #[test]
    fn test_into_inner() {
        let img = ImageBuffer::from_test_pattern(100, 100);
        let dynamic = img.into_inner();
        assert_eq!(dynamic.dimensions(), (100, 100));
    }
}
