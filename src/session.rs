//! The state a viewer keeps between events: one volume, the navigation
//! cursor and the current window.

use std::{fmt, path::Path};

use log::info;
use thiserror::Error;

use crate::{
    crosshair::map_crosshair,
    enums::{Orientation, ResampleFilter},
    resampler::{DisplayImage, resample_for_display},
    slice_record::{PatientInfo, SliceRecord},
    volume::{Volume, VolumeError},
    volume_loader::{VolumeLoader, VolumeLoaderError},
    windowing::{WindowParams, apply_window},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No volume loaded")]
    NoVolumeLoaded,

    #[error(transparent)]
    Load(#[from] VolumeLoaderError),

    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// Current slice on each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Sagittal slice.
    pub x: usize,
    /// Coronal slice.
    pub y: usize,
    /// Axial slice.
    pub z: usize,
}

impl Cursor {
    pub fn centered(volume: &Volume) -> Self {
        Self {
            x: volume.width() / 2,
            y: volume.height() / 2,
            z: volume.depth() / 2,
        }
    }

    /// Index of the plane shown along `orientation`.
    pub fn index(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Axial => self.z,
            Orientation::Coronal => self.y,
            Orientation::Sagittal => self.x,
        }
    }

    fn index_mut(&mut self, orientation: Orientation) -> &mut usize {
        match orientation {
            Orientation::Axial => &mut self.z,
            Orientation::Coronal => &mut self.y,
            Orientation::Sagittal => &mut self.x,
        }
    }

    /// Indices of the two axes lying in the plane, as (column, row).
    pub fn in_plane(&self, orientation: Orientation) -> (usize, usize) {
        match orientation {
            Orientation::Axial => (self.x, self.y),
            Orientation::Coronal => (self.x, self.z),
            Orientation::Sagittal => (self.y, self.z),
        }
    }
}

/// One refresh worth of views, all rendered from the same cursor.
#[derive(Clone, Debug)]
pub struct Views {
    pub axial: DisplayImage,
    pub coronal: DisplayImage,
    pub sagittal: DisplayImage,
}

impl Views {
    pub fn get(&self, orientation: Orientation) -> &DisplayImage {
        match orientation {
            Orientation::Axial => &self.axial,
            Orientation::Coronal => &self.coronal,
            Orientation::Sagittal => &self.sagittal,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VolumeSummary {
    pub patient: PatientInfo,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub slice_thickness: f64,
}

impl fmt::Display for VolumeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = non_empty(&self.patient.name);
        let id = non_empty(&self.patient.id);
        writeln!(f, "Name: {name}")?;
        writeln!(f, "ID: {id}")?;
        writeln!(f, "Size: {} x {}", self.width, self.height)?;
        writeln!(f, "Slices: {}", self.depth)?;
        write!(f, "Thickness: {} mm", self.slice_thickness)
    }
}

fn non_empty(value: &str) -> &str {
    if value.is_empty() { "Unknown" } else { value }
}

/// Render one view: extract, window, fit to the display, place the crosshair.
pub fn render_view(
    volume: &Volume,
    orientation: Orientation,
    cursor: Cursor,
    window: WindowParams,
    max_dim: u32,
    filter: ResampleFilter,
) -> Result<DisplayImage, VolumeError> {
    let plane = volume.extract_plane(orientation, cursor.index(orientation))?;
    let grey = apply_window(&plane, window);
    let (column, row) = cursor.in_plane(orientation);
    let crosshair = map_crosshair(column, row, plane.width(), plane.height());
    Ok(resample_for_display(&grey, plane.scale_y, max_dim, filter).with_crosshair(crosshair))
}

#[derive(Debug, Default)]
pub struct ViewerSession {
    volume: Option<Volume>,
    cursor: Cursor,
    window: WindowParams,
}

impl ViewerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume(&self) -> Option<&Volume> {
        self.volume.as_ref()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn window(&self) -> WindowParams {
        self.window
    }

    /// Assemble a new volume and make it current.
    ///
    /// On failure the previous volume and cursor are kept.
    pub fn load(&mut self, candidates: Vec<SliceRecord>) -> Result<&Volume, SessionError> {
        let volume = VolumeLoader::load_volume(candidates)?;
        Ok(self.replace_volume(volume))
    }

    pub fn load_from_directory(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<&Volume, SessionError> {
        let volume = VolumeLoader::load_from_directory(path)?;
        Ok(self.replace_volume(volume))
    }

    fn replace_volume(&mut self, volume: Volume) -> &Volume {
        self.cursor = Cursor::centered(&volume);
        info!("volume loaded, cursor at {:?}", self.cursor);
        self.volume.insert(volume)
    }

    fn loaded(&self) -> Result<&Volume, SessionError> {
        self.volume.as_ref().ok_or(SessionError::NoVolumeLoaded)
    }

    /// Move the slice along `orientation` to `index`, clamped to the volume.
    pub fn set_index(
        &mut self,
        orientation: Orientation,
        index: usize,
    ) -> Result<usize, SessionError> {
        let last = self.loaded()?.extent(orientation).saturating_sub(1);
        let slot = self.cursor.index_mut(orientation);
        *slot = index.min(last);
        Ok(*slot)
    }

    /// Step the slice along `orientation` by `delta`, clamped to the volume.
    pub fn scroll(
        &mut self,
        orientation: Orientation,
        delta: isize,
    ) -> Result<usize, SessionError> {
        let current = self.cursor.index(orientation);
        self.set_index(orientation, current.saturating_add_signed(delta))
    }

    pub fn set_window(&mut self, window: WindowParams) {
        self.window = WindowParams::new(window.level, window.width);
    }

    /// Re-centre the cursor and restore the default window.
    ///
    /// Does nothing without a volume.
    pub fn reset(&mut self) {
        if let Some(volume) = &self.volume {
            self.cursor = Cursor::centered(volume);
            self.window = WindowParams::default();
        }
    }

    pub fn summary(&self) -> Option<VolumeSummary> {
        let volume = self.volume.as_ref()?;
        Some(VolumeSummary {
            patient: volume.patient().cloned().unwrap_or_default(),
            width: volume.width(),
            height: volume.height(),
            depth: volume.depth(),
            slice_thickness: volume.spacing().thickness,
        })
    }

    /// Render all three views from the current cursor and window.
    pub fn refresh(&self, max_dim: u32, filter: ResampleFilter) -> Result<Views, SessionError> {
        let volume = self.loaded()?;
        let (cursor, window) = (self.cursor, self.window);
        let render =
            |orientation| render_view(volume, orientation, cursor, window, max_dim, filter);

        let (axial, (coronal, sagittal)) = rayon::join(
            || render(Orientation::Axial),
            || {
                rayon::join(
                    || render(Orientation::Coronal),
                    || render(Orientation::Sagittal),
                )
            },
        );
        Ok(Views {
            axial: axial?,
            coronal: coronal?,
            sagittal: sagittal?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice_record::Spacing;

    fn series(width: usize, height: usize, depth: usize) -> Vec<SliceRecord> {
        (0..depth)
            .map(|z| {
                SliceRecord::new("s", z as i32, width, height, vec![z as i16 * 100; width * height])
                    .with_spacing(Spacing::new(1.0, 1.0, 2.0))
            })
            .collect()
    }

    #[test]
    fn load_centres_cursor() {
        let mut session = ViewerSession::new();
        session.load(series(6, 4, 5)).unwrap();
        assert_eq!(session.cursor(), Cursor { x: 3, y: 2, z: 2 });
    }

    #[test]
    fn failed_load_keeps_previous_volume() {
        let mut session = ViewerSession::new();
        session.load(series(6, 4, 5)).unwrap();
        session.set_index(Orientation::Axial, 4).unwrap();

        assert!(matches!(
            session.load(Vec::new()),
            Err(SessionError::Load(VolumeLoaderError::EmptyInput))
        ));
        let mut bad = series(2, 2, 1);
        bad[0].samples.clear();
        assert!(session.load(bad).is_err());

        assert_eq!(session.volume().unwrap().dim(), (5, 4, 6));
        assert_eq!(session.cursor().z, 4);
        assert!(session.refresh(800, ResampleFilter::default()).is_ok());
    }

    #[test]
    fn navigation_is_clamped() {
        let mut session = ViewerSession::new();
        assert!(matches!(
            session.set_index(Orientation::Axial, 0),
            Err(SessionError::NoVolumeLoaded)
        ));

        session.load(series(6, 4, 5)).unwrap();
        assert_eq!(session.set_index(Orientation::Sagittal, 99).unwrap(), 5);
        assert_eq!(session.scroll(Orientation::Coronal, -10).unwrap(), 0);
        assert_eq!(session.scroll(Orientation::Coronal, 1).unwrap(), 1);
        assert_eq!(session.scroll(Orientation::Axial, 10).unwrap(), 4);
        assert_eq!(session.cursor(), Cursor { x: 5, y: 1, z: 4 });
    }

    #[test]
    fn reset_restores_centre_and_window() {
        let mut session = ViewerSession::new();
        session.set_window(WindowParams::new(500, 0));
        session.reset();
        assert_eq!(session.window(), WindowParams::new(500, 1));

        session.load(series(6, 4, 5)).unwrap();
        session.set_index(Orientation::Axial, 0).unwrap();
        session.reset();
        assert_eq!(session.cursor(), Cursor { x: 3, y: 2, z: 2 });
        assert_eq!(session.window(), WindowParams::default());
    }

    #[test]
    fn refresh_renders_three_consistent_views() {
        let mut session = ViewerSession::new();
        session.load(series(6, 4, 5)).unwrap();
        session.set_index(Orientation::Sagittal, 5).unwrap();
        session.set_index(Orientation::Coronal, 0).unwrap();
        session.set_index(Orientation::Axial, 4).unwrap();

        let views = session.refresh(800, ResampleFilter::default()).unwrap();
        assert_eq!(views.axial.image.dimensions(), (6, 4));
        // Coronal and sagittal planes are stretched by the slice thickness.
        assert_eq!(views.coronal.image.dimensions(), (6, 10));
        assert_eq!(views.sagittal.image.dimensions(), (4, 10));

        let axial = views.get(Orientation::Axial).crosshair.unwrap();
        assert_eq!((axial.x, axial.y), (1.0, 0.0));
        let coronal = views.coronal.crosshair.unwrap();
        assert_eq!((coronal.x, coronal.y), (1.0, 1.0));
        let sagittal = views.sagittal.crosshair.unwrap();
        assert_eq!((sagittal.x, sagittal.y), (0.0, 1.0));
    }

    #[test]
    fn refresh_without_volume_fails() {
        let session = ViewerSession::new();
        assert!(matches!(
            session.refresh(800, ResampleFilter::default()),
            Err(SessionError::NoVolumeLoaded)
        ));
        assert_eq!(session.summary(), None);
    }

    #[test]
    fn summary_lists_volume_facts() {
        let mut session = ViewerSession::new();
        let mut slices = series(6, 4, 5);
        slices[0].patient = Some(PatientInfo {
            name: "Doe^John".into(),
            id: String::new(),
        });
        session.load(slices).unwrap();
        let text = session.summary().unwrap().to_string();
        assert_eq!(
            text,
            "Name: Doe^John\nID: Unknown\nSize: 6 x 4\nSlices: 5\nThickness: 2 mm"
        );
    }
}
