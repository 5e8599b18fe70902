use std::io::Cursor;

use image::{ImageFormat, ImageResult, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const INK: [u8; 3] = [0, 0, 0];

/// Largest buffer side in device pixels. Larger surfaces are clamped.
pub const MAX_SURFACE_EXTENT: u32 = 8_192;
pub const MAX_DEVICE_PIXEL_RATIO: f32 = 8.0;
pub const MAX_STROKE_WIDTH: f32 = 32.0;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SurfaceError {
    #[error("surface must be at least 1x1 CSS pixels, got {width}x{height}")]
    TooSmall { width: f32, height: f32 },
    #[error("surface of {width}x{height} device pixels exceeds {MAX_SURFACE_EXTENT} per side")]
    TooLarge { width: f32, height: f32 },
    #[error("device pixel ratio must be in range (0, {MAX_DEVICE_PIXEL_RATIO}], got {0}")]
    InvalidPixelRatio(f32),
    #[error("stroke width must be in range (0, {MAX_STROKE_WIDTH}], got {0}")]
    InvalidStrokeWidth(f32),
}

/// On-screen size of the drawing element in CSS pixels plus the display's
/// device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f32,
}

fn default_device_pixel_ratio() -> f32 {
    1.0
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self { width, height, device_pixel_ratio }
    }

    /// Ratio used for drawing. Unusable ratios fall back to 1.
    pub fn scale(&self) -> f32 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    pub fn pixel_dimensions(&self) -> (u32, u32) {
        (scaled_extent(self.width, self.scale()), scaled_extent(self.height, self.scale()))
    }

    /// Rejects sizes the pad would have to clamp or fall back on.
    pub fn validate(&self) -> Result<(), SurfaceError> {
        let ratio = self.device_pixel_ratio;
        if !(ratio > 0.0 && ratio <= MAX_DEVICE_PIXEL_RATIO) {
            return Err(SurfaceError::InvalidPixelRatio(ratio));
        }
        if !(self.width >= 1.0 && self.height >= 1.0) {
            return Err(SurfaceError::TooSmall { width: self.width, height: self.height });
        }

        let limit = MAX_SURFACE_EXTENT as f32;
        let (width, height) = ((self.width * ratio).round(), (self.height * ratio).round());
        if !(width <= limit && height <= limit) {
            return Err(SurfaceError::TooLarge { width, height });
        }
        Ok(())
    }
}

pub fn validate_stroke_width(stroke_width: f32) -> Result<(), SurfaceError> {
    if stroke_width > 0.0 && stroke_width <= MAX_STROKE_WIDTH {
        Ok(())
    } else {
        Err(SurfaceError::InvalidStrokeWidth(stroke_width))
    }
}

fn scaled_extent(css: f32, scale: f32) -> u32 {
    let pixels = (css * scale).round();
    if pixels.is_finite() && pixels >= 1.0 {
        pixels.min(MAX_SURFACE_EXTENT as f32) as u32
    } else {
        1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// Pixel buffer backing the signature pad. Coordinates passed in are CSS
/// pixels; the buffer is scaled by the device pixel ratio.
#[derive(Clone, Debug)]
pub struct Surface {
    image: RgbaImage,
    scale: f32,
}

impl Surface {
    pub fn new(size: SurfaceSize) -> Self {
        let (width, height) = size.pixel_dimensions();
        Self { image: RgbaImage::new(width, height), scale: size.scale() }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|pixel| pixel[3] == 0)
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.image.get_pixel_checked(x, y).map(|pixel| pixel[3])
    }

    /// Draws a line segment with round caps. Consecutive segments sharing an
    /// endpoint therefore meet with a round join.
    pub fn stroke_segment(&mut self, from: Point, to: Point, line_width: f32) {
        let radius = (line_width * self.scale / 2.0).max(0.5);
        let (x0, y0) = (from.x * self.scale, from.y * self.scale);
        let (x1, y1) = (to.x * self.scale, to.y * self.scale);
        if ![x0, y0, x1, y1].iter().all(|value| value.is_finite()) {
            return;
        }

        let (width, height) = self.image.dimensions();
        let min_x = ((x0.min(x1) - radius - 1.0).floor().max(0.0)) as i64;
        let min_y = ((y0.min(y1) - radius - 1.0).floor().max(0.0)) as i64;
        let max_x = ((x0.max(x1) + radius + 1.0).ceil() as i64).min(i64::from(width) - 1);
        let max_y = ((y0.max(y1) + radius + 1.0).ceil() as i64).min(i64::from(height) - 1);

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let center = (px as f32 + 0.5, py as f32 + 0.5);
                let distance = distance_to_segment(center, (x0, y0), (x1, y1));
                let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let alpha = (coverage * 255.0).round() as u8;
                let pixel = self.image.get_pixel_mut(px as u32, py as u32);
                if alpha > pixel[3] {
                    *pixel = Rgba([INK[0], INK[1], INK[2], alpha]);
                }
            }
        }
    }

    pub fn encode_png(&self) -> ImageResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

fn distance_to_segment(point: (f32, f32), start: (f32, f32), end: (f32, f32)) -> f32 {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((point.0 - start.0) * dx + (point.1 - start.1) * dy) / length_sq).clamp(0.0, 1.0)
    };
    let (nearest_x, nearest_y) = (start.0 + t * dx, start.1 + t * dy);
    ((point.0 - nearest_x).powi(2) + (point.1 - nearest_y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::{
        validate_stroke_width, Point, Surface, SurfaceError, SurfaceSize, MAX_SURFACE_EXTENT,
    };

    #[test]
    fn oversized_surfaces_are_clamped_instead_of_allocated() {
        let size = SurfaceSize::new(1.0e6, 1.0e6, 1.0);
        assert_eq!(size.pixel_dimensions(), (MAX_SURFACE_EXTENT, MAX_SURFACE_EXTENT));
        assert!(matches!(size.validate(), Err(SurfaceError::TooLarge { .. })));
    }

    #[test]
    fn validation_covers_ratio_extent_and_stroke_width() {
        assert_eq!(SurfaceSize::new(600.0, 160.0, 1.0).validate(), Ok(()));
        assert_eq!(SurfaceSize::new(4_096.0, 100.0, 2.0).validate(), Ok(()));
        assert!(matches!(
            SurfaceSize::new(4_097.0, 100.0, 2.0).validate(),
            Err(SurfaceError::TooLarge { .. })
        ));
        assert!(matches!(
            SurfaceSize::new(0.5, 100.0, 1.0).validate(),
            Err(SurfaceError::TooSmall { .. })
        ));
        assert!(matches!(
            SurfaceSize::new(f32::NAN, 100.0, 1.0).validate(),
            Err(SurfaceError::TooSmall { .. })
        ));
        assert_eq!(
            SurfaceSize::new(100.0, 100.0, 9.0).validate(),
            Err(SurfaceError::InvalidPixelRatio(9.0))
        );
        assert_eq!(validate_stroke_width(2.5), Ok(()));
        assert_eq!(validate_stroke_width(0.0), Err(SurfaceError::InvalidStrokeWidth(0.0)));
        assert_eq!(validate_stroke_width(40.0), Err(SurfaceError::InvalidStrokeWidth(40.0)));
    }

    #[test]
    fn pixel_dimensions_scale_with_device_pixel_ratio() {
        assert_eq!(SurfaceSize::new(300.0, 80.0, 2.0).pixel_dimensions(), (600, 160));
        assert_eq!(SurfaceSize::new(100.4, 50.6, 1.0).pixel_dimensions(), (100, 51));
        assert_eq!(SurfaceSize::new(0.0, -3.0, 1.0).pixel_dimensions(), (1, 1));
        assert_eq!(SurfaceSize::new(10.0, 10.0, f32::NAN).pixel_dimensions(), (10, 10));
    }

    #[test]
    fn segment_inks_pixels_along_its_path_only() {
        let mut surface = Surface::new(SurfaceSize::new(40.0, 20.0, 1.0));
        assert!(surface.is_blank());

        surface.stroke_segment(Point::new(5.0, 10.0), Point::new(35.0, 10.0), 2.5);

        assert_eq!(surface.alpha_at(20, 9), Some(255));
        assert_eq!(surface.alpha_at(20, 2), Some(0));
        assert_eq!(surface.alpha_at(20, 18), Some(0));
        assert!(!surface.is_blank());
    }

    #[test]
    fn round_caps_extend_past_segment_ends() {
        let mut surface = Surface::new(SurfaceSize::new(40.0, 20.0, 1.0));
        surface.stroke_segment(Point::new(10.0, 10.0), Point::new(30.0, 10.0), 6.0);

        assert!(surface.alpha_at(8, 9).unwrap_or(0) > 0, "cap should cover left of start");
        assert!(surface.alpha_at(31, 9).unwrap_or(0) > 0, "cap should cover right of end");
        assert_eq!(surface.alpha_at(4, 9), Some(0));
    }

    #[test]
    fn strokes_are_scaled_for_dense_displays() {
        let mut surface = Surface::new(SurfaceSize::new(20.0, 10.0, 2.0));
        surface.stroke_segment(Point::new(2.0, 5.0), Point::new(18.0, 5.0), 2.0);

        assert_eq!(surface.dimensions(), (40, 20));
        assert_eq!(surface.alpha_at(20, 9), Some(255));
        assert_eq!(surface.alpha_at(20, 2), Some(0));
    }

    #[test]
    fn out_of_bounds_segments_are_clipped() {
        let mut surface = Surface::new(SurfaceSize::new(10.0, 10.0, 1.0));
        surface.stroke_segment(Point::new(-50.0, 5.0), Point::new(-20.0, 5.0), 2.0);
        assert!(surface.is_blank());

        surface.stroke_segment(Point::new(-5.0, 5.0), Point::new(60.0, 5.0), 2.0);
        assert_eq!(surface.alpha_at(0, 4), Some(255));
        assert_eq!(surface.alpha_at(9, 4), Some(255));

        surface.clear();
        assert!(surface.is_blank());
    }

    #[test]
    fn encodes_as_png() {
        let surface = Surface::new(SurfaceSize::new(4.0, 3.0, 1.0));
        let png = surface.encode_png().expect("png encoding");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
