//! Field sizing
//!
//! Pure functions: no GPU state, so both backends and the tests share them.

/// Dimensions of a simulation field, always at least 1x1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSize {
    pub width: u32,
    pub height: u32,
}

impl FieldSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Size of one texel in texture coordinates
    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Field dimensions for a base resolution on a canvas of the given size.
///
/// The shorter canvas side gets `resolution` texels and the longer side gets
/// `resolution * aspect`, so simulation cells stay roughly square.
pub fn get_resolution(resolution: u32, canvas_width: u32, canvas_height: u32) -> FieldSize {
    let width = canvas_width.max(1) as f32;
    let height = canvas_height.max(1) as f32;

    let mut aspect_ratio = width / height;
    if aspect_ratio < 1.0 {
        aspect_ratio = 1.0 / aspect_ratio;
    }

    let min = resolution;
    let max = (resolution as f32 * aspect_ratio).round() as u32;

    if width > height {
        FieldSize::new(max, min)
    } else {
        FieldSize::new(min, max)
    }
}

/// Splat radius in texture space, stretched on wide canvases so the blob stays round
pub fn correct_radius(radius: f32, aspect_ratio: f32) -> f32 {
    if aspect_ratio > 1.0 {
        radius * aspect_ratio
    } else {
        radius
    }
}

/// Logical (CSS) length in device pixels, truncated to whole pixels.
/// Only for sizing the canvas; pointer positions keep their fraction.
pub fn scale_to_device_pixels(length: f32, pixel_ratio: f32) -> u32 {
    (length * pixel_ratio).floor().max(0.0) as u32
}
