use crate::enums::Orientation;
use crate::slice_record::{PatientInfo, Spacing};

use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VolumeError {
    #[error("{orientation} index {index} is outside 0..{extent}")]
    IndexOutOfRange {
        orientation: Orientation,
        index: usize,
        extent: usize,
    },

    #[error("Voxel storage holds {actual} samples, expected {expected}")]
    CorruptVolume { expected: usize, actual: usize },
}

/// A stack of equally sized slices, stored as `(depth, height, width)`.
///
/// A volume is read-only once assembled; loading another series produces a
/// new volume.
#[derive(Clone, Debug)]
pub struct Volume {
    data: Array3<i16>,
    spacing: Spacing,
    patient: Option<PatientInfo>,
}

/// A 2D cross-section of a [`Volume`], stored as `(height, width)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    pub data: Array2<i16>,
    /// Physical height of a row relative to the physical width of a column.
    pub scale_y: f64,
}

impl Plane {
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Samples in row-major order, if the plane is in standard layout.
    pub fn samples(&self) -> Option<&[i16]> {
        self.data.as_slice()
    }
}

impl Volume {
    pub fn new(data: Array3<i16>, spacing: Spacing) -> Self {
        Self {
            data,
            spacing: spacing.sanitized(),
            patient: None,
        }
    }

    /// Build a volume from slices concatenated in a flat buffer.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::CorruptVolume`] if `voxels` does not hold exactly
    /// `width * height * depth` samples.
    pub fn from_raw_parts(
        width: usize,
        height: usize,
        depth: usize,
        spacing: Spacing,
        voxels: Vec<i16>,
    ) -> Result<Self, VolumeError> {
        let actual = voxels.len();
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth))
            .ok_or(VolumeError::CorruptVolume {
                expected: usize::MAX,
                actual,
            })?;
        let data = Array3::from_shape_vec((depth, height, width), voxels)
            .map_err(|_| VolumeError::CorruptVolume { expected, actual })?;
        Ok(Self::new(data, spacing))
    }

    pub(crate) fn with_patient(mut self, patient: Option<PatientInfo>) -> Self {
        self.patient = patient;
        self
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn depth(&self) -> usize {
        self.data.dim().0
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<i16> {
        &self.data
    }

    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    pub fn patient(&self) -> Option<&PatientInfo> {
        self.patient.as_ref()
    }

    /// Number of planes available along the axis fixed by `orientation`.
    pub fn extent(&self, orientation: Orientation) -> usize {
        let (depth, height, width) = self.dim();
        match orientation {
            Orientation::Axial => depth,
            Orientation::Coronal => height,
            Orientation::Sagittal => width,
        }
    }

    /// Physical aspect ratio (row height over column width) of planes
    /// extracted along `orientation`.
    pub fn scale_y(&self, orientation: Orientation) -> f64 {
        let Spacing { x, y, thickness } = self.spacing;
        match orientation {
            Orientation::Axial => y / x,
            Orientation::Coronal => thickness / x,
            Orientation::Sagittal => thickness / y,
        }
    }

    /// Borrow a cross-section without copying.
    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ArrayView2<'_, i16>> {
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice_result = match orientation {
            Orientation::Axial => self.data.slice(s![index, .., ..]),
            Orientation::Coronal => self.data.slice(s![.., index, ..]),
            Orientation::Sagittal => self.data.slice(s![.., .., index]),
        };
        Some(slice_result)
    }

    /// Copy the cross-section at `index` along `orientation` into a new plane.
    ///
    /// Axial planes are `width x height`, coronal planes `width x depth` and
    /// sagittal planes `height x depth`.
    ///
    /// # Errors
    ///
    /// [`VolumeError::IndexOutOfRange`] if `index` is not below
    /// [`Volume::extent`], [`VolumeError::CorruptVolume`] if the voxel storage
    /// cannot back the requested read.
    pub fn extract_plane(
        &self,
        orientation: Orientation,
        index: usize,
    ) -> Result<Plane, VolumeError> {
        let (plane_height, plane_width) = self
            .get_slice_from_axis(index, orientation)
            .ok_or(VolumeError::IndexOutOfRange {
                orientation,
                index,
                extent: self.extent(orientation),
            })?
            .dim();

        let (depth, height, width) = self.dim();
        let expected = width * height * depth;
        let voxels = self
            .data
            .as_slice()
            .filter(|voxels| voxels.len() == expected)
            .ok_or(VolumeError::CorruptVolume {
                expected,
                actual: self.data.len(),
            })?;
        let corrupt = VolumeError::CorruptVolume {
            expected,
            actual: voxels.len(),
        };

        let slice_len = width * height;
        let samples = match orientation {
            Orientation::Axial => {
                let start = index * slice_len;
                voxels
                    .get(start..start + slice_len)
                    .ok_or(corrupt.clone())?
                    .to_vec()
            }
            Orientation::Coronal => {
                let mut samples = vec![0i16; plane_width * plane_height];
                samples
                    .par_chunks_mut(plane_width.max(1))
                    .enumerate()
                    .try_for_each(|(z, row)| {
                        let start = z * slice_len + index * width;
                        let source = voxels.get(start..start + width).ok_or(corrupt.clone())?;
                        row.copy_from_slice(source);
                        Ok::<_, VolumeError>(())
                    })?;
                samples
            }
            Orientation::Sagittal => {
                let mut samples = vec![0i16; plane_width * plane_height];
                samples
                    .par_chunks_mut(plane_width.max(1))
                    .enumerate()
                    .try_for_each(|(z, row)| {
                        for (y, sample) in row.iter_mut().enumerate() {
                            *sample = *voxels
                                .get(z * slice_len + y * width + index)
                                .ok_or(corrupt.clone())?;
                        }
                        Ok::<_, VolumeError>(())
                    })?;
                samples
            }
        };

        let data = Array2::from_shape_vec((plane_height, plane_width), samples)
            .map_err(|_| corrupt)?;
        Ok(Plane {
            data,
            scale_y: self.scale_y(orientation),
        })
    }

    fn is_valid_index(&self, index: usize, orientation: Orientation) -> bool {
        index < self.extent(orientation)
    }
}
