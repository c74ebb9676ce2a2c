//! # DICOM-MPR library
//!
//! This crate turns a folder of cross-sectional DICOM images into a volume
//! and renders the three orthogonal planes of that volume for display.
//!
//! A load groups the decoded slices by Series Instance UID, keeps the series
//! with the most slices and stacks them by Instance Number. Slices whose size
//! differs from the first slice of the series are dropped instead of failing
//! the whole load. The volume can then be sliced in the three medical axes:
//!  - Axial
//!  - Coronal
//!  - Sagittal
//!
//! Every view goes through the same steps: the plane is copied out of the
//! volume, mapped to 8-bit grey with a window level/width, stretched to its
//! physical aspect ratio and bounded to a display size. The crosshair of each
//! view marks where the other two planes cut it.
//!
//! DICOM files are assumed to have the following attributes:
//!   - Axial data set
//!   - No multiframe (always the first frame is used)
//!   - Samples fit signed 16-bit after the modality rescale (others saturate)
//!
//! # Examples
//!
//! ## Rendering the three views of a directory
//!
//! ```no_run
//! # use dicom_mpr::{ViewerSession, ResampleFilter, WindowParams, DEFAULT_MAX_DISPLAY_DIM};
//! let mut session = ViewerSession::new();
//! session
//!     .load_from_directory("dicom")
//!     .expect("should have loaded files from directory");
//! session.set_window(WindowParams::new(-600, 1500));
//! let views = session
//!     .refresh(DEFAULT_MAX_DISPLAY_DIM, ResampleFilter::default())
//!     .expect("should have rendered all three views");
//! views.sagittal.image.save("sagittal.png").unwrap();
//! ```
//!
//! ## Using the pipeline directly
//!
//! ```
//! # use dicom_mpr::{
//! #     SliceRecord, VolumeLoader, Orientation, WindowParams, ResampleFilter,
//! #     apply_window, map_crosshair, resample_for_display,
//! # };
//! let slices = (0..3)
//!     .map(|z| SliceRecord::new("1.2.3", z, 4, 4, vec![z as i16 * 100; 16]))
//!     .collect();
//! let volume = VolumeLoader::load_volume(slices).unwrap();
//! let plane = volume.extract_plane(Orientation::Coronal, 1).unwrap();
//! let grey = apply_window(&plane, WindowParams::new(100, 200));
//! let view = resample_for_display(&grey, plane.scale_y, 800, ResampleFilter::default())
//!     .with_crosshair(map_crosshair(2, 1, plane.width(), plane.height()));
//! assert_eq!(view.image.dimensions(), (4, 3));
//! ```

pub mod crosshair;
pub mod decoder;
pub mod enums;
pub mod resampler;
pub mod series_selector;
pub mod session;
pub mod slice_record;
pub mod volume;
pub mod volume_loader;
pub mod windowing;

pub use crosshair::{Crosshair, map_crosshair};
pub use enums::{Orientation, ResampleFilter};
pub use resampler::{
    DEFAULT_MAX_DISPLAY_DIM, DisplayImage, display_dimensions, resample_for_display,
};
pub use series_selector::select_dominant_series;
pub use session::{Cursor, SessionError, ViewerSession, Views, VolumeSummary, render_view};
pub use slice_record::{PatientInfo, SliceRecord, Spacing};
pub use volume::{Plane, Volume, VolumeError};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
pub use windowing::{WindowParams, apply_window};
