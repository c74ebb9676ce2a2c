/// Position of the crosshair on a view, in `[0, 1]` of the view's width and
/// height. Resampling a view does not move it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crosshair {
    pub x: f64,
    pub y: f64,
}

/// Place the crosshair for a plane of `plane_width x plane_height` samples.
///
/// `column` and `row` are the navigation indices of the two axes that lie in
/// the plane. An axis with a single sample maps to 0.
pub fn map_crosshair(
    column: usize,
    row: usize,
    plane_width: usize,
    plane_height: usize,
) -> Crosshair {
    Crosshair {
        x: normalize(column, plane_width),
        y: normalize(row, plane_height),
    }
}

#[inline]
fn normalize(index: usize, extent: usize) -> f64 {
    if extent <= 1 {
        return 0.0;
    }
    (index as f64 / (extent - 1) as f64).clamp(0.0, 1.0)
}
