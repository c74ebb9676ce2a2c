use std::ops::RangeInclusive;

use image::GrayImage;
use ndarray::Axis;
use rayon::prelude::*;

use crate::volume::Plane;

/// Linear window mapping raw samples onto the 0..=255 grey range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowParams {
    /// Centre of the window, in raw sample units. May be negative.
    pub level: i32,
    /// Range of raw samples spread over the grey scale. Values below 1 act as 1.
    pub width: i32,
}

impl Default for WindowParams {
    /// Soft tissue window.
    fn default() -> Self {
        Self {
            level: 40,
            width: 400,
        }
    }
}

impl WindowParams {
    /// Level range offered by the viewer controls.
    pub const LEVEL_RANGE: RangeInclusive<i32> = -1000..=3000;
    /// Width range offered by the viewer controls.
    pub const WIDTH_RANGE: RangeInclusive<i32> = 1..=4000;

    pub fn new(level: i32, width: i32) -> Self {
        Self {
            level,
            width: width.max(1),
        }
    }

    /// Lowest raw value that is not fully black.
    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.level as f64 - self.effective_width() / 2.0
    }

    #[inline]
    fn effective_width(&self) -> f64 {
        self.width.max(1) as f64
    }

    /// Map one raw sample to a grey value.
    #[inline]
    pub fn apply(&self, value: i16) -> u8 {
        let width = self.effective_width();
        let lower = self.lower_bound();
        let value = value as f64;
        if value <= lower {
            u8::MIN
        } else if value >= lower + width {
            u8::MAX
        } else {
            // 255, not 256.
            ((value - lower) / width * 255.0) as u8
        }
    }
}

/// Window a plane into an 8-bit grey image of the same size.
pub fn apply_window(plane: &Plane, window: WindowParams) -> GrayImage {
    let (width, height) = (plane.width(), plane.height());
    let mut image = GrayImage::new(width as u32, height as u32);
    image
        .par_chunks_mut(width.max(1))
        .zip(plane.data.axis_iter(Axis(0)).into_par_iter())
        .for_each(|(out, row)| {
            for (pixel, &value) in out.iter_mut().zip(row.iter()) {
                *pixel = window.apply(value);
            }
        });
    image
}
