use image::{GrayImage, imageops};

use crate::{crosshair::Crosshair, enums::ResampleFilter};

/// Largest side, in pixels, of a view handed to the renderer.
pub const DEFAULT_MAX_DISPLAY_DIM: u32 = 800;

/// A windowed, aspect-corrected view ready to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayImage {
    pub image: GrayImage,
    /// `None` until a crosshair has been mapped onto the view.
    pub crosshair: Option<Crosshair>,
}

impl DisplayImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn with_crosshair(mut self, crosshair: Crosshair) -> Self {
        self.crosshair = Some(crosshair);
        self
    }
}

/// Output size for a `width x height` image whose rows are `scale_y` times
/// as tall as its columns are wide, bounded by `max_dim` on both sides.
///
/// Images inside the bound are only stretched vertically, never enlarged.
pub fn display_dimensions(width: u32, height: u32, scale_y: f64, max_dim: u32) -> (u32, u32) {
    let scale_y = if scale_y.is_finite() && scale_y > 0.0 {
        scale_y
    } else {
        1.0
    };
    let bound = max_dim.max(1) as f64;
    let mut target_width = width as f64;
    let mut target_height = (height as f64 * scale_y).round();

    if target_width > bound || target_height > bound {
        let shrink = (bound / target_width).min(bound / target_height);
        target_width = (target_width * shrink).round();
        target_height = (target_height * shrink).round();
    }

    (
        (target_width as u32).clamp(1, max_dim.max(1)),
        (target_height as u32).clamp(1, max_dim.max(1)),
    )
}

/// Aspect-correct `image` and fit it inside `max_dim x max_dim`.
pub fn resample_for_display(
    image: &GrayImage,
    scale_y: f64,
    max_dim: u32,
    filter: ResampleFilter,
) -> DisplayImage {
    let (width, height) = image.dimensions();
    let (target_width, target_height) = display_dimensions(width, height, scale_y, max_dim);

    let image = if width == 0 || height == 0 {
        GrayImage::new(target_width, target_height)
    } else if (target_width, target_height) == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, target_width, target_height, filter.into())
    };

    DisplayImage {
        image,
        crosshair: None,
    }
}
