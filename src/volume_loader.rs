use crate::{
    decoder,
    series_selector::select_dominant_series,
    slice_record::{SliceRecord, Spacing},
    volume::{Volume, VolumeError},
};

use log::{debug, info};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No slices with a usable series identifier")]
    EmptyInput,

    #[error("No slice matches the dimensions of the series")]
    NoValidSlices,

    #[error("Assembled volume is inconsistent: {0}")]
    CorruptVolume(#[from] VolumeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Assemble a volume from decoded slices
    ///
    /// The series with the most slices is kept. Its first slice, in the
    /// order given, fixes the width, height and spacing of the volume; slices
    /// of any other size are dropped. The remaining slices are stacked in
    /// ascending order key, keeping the given order for equal keys.
    ///
    /// # Arguments
    ///
    /// * `candidates` - Decoded slices, possibly from several series
    ///
    /// # Errors
    ///
    /// Returns [`VolumeLoaderError::EmptyInput`] if no slice has a usable
    /// series key and [`VolumeLoaderError::NoValidSlices`] if no slice of the
    /// chosen series survives the dimension check.
    pub fn load_volume(candidates: Vec<SliceRecord>) -> Result<Volume, VolumeLoaderError> {
        let mut slices = select_dominant_series(candidates)?;

        let canonical = slices.first().ok_or(VolumeLoaderError::EmptyInput)?;
        let (width, height) = (canonical.width, canonical.height);
        let spacing = canonical.spacing.unwrap_or_default().sanitized();
        let patient = canonical.patient.clone();

        Self::sort_slices(&mut slices);

        let total = slices.len();
        let accepted: Vec<SliceRecord> = slices
            .into_iter()
            .filter(|slice| {
                let keep = Self::matches_dimensions(slice, width, height);
                if !keep {
                    debug!(
                        "dropping slice {} ({}x{}, {} samples), expected {width}x{height}",
                        slice.order_key,
                        slice.width,
                        slice.height,
                        slice.samples.len()
                    );
                }
                keep
            })
            .collect();

        if accepted.is_empty() {
            return Err(VolumeLoaderError::NoValidSlices);
        }

        let depth = accepted.len();
        let voxels = Self::build_voxels(accepted, width * height);
        let volume = Volume::from_raw_parts(width, height, depth, spacing, voxels)?;
        info!(
            "assembled {width}x{height}x{depth} volume from {total} slices, spacing {:?}",
            volume.spacing()
        );

        Ok(volume.with_patient(patient))
    }

    /// Decode the given files and assemble a volume from them
    ///
    /// Only files of the series with the most headers are decoded. Files that
    /// fail to read or decode are skipped.
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
    ) -> Result<Volume, VolumeLoaderError> {
        Self::load_volume(decoder::decode_dominant_series(paths))
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
        Self::load_volume(decoder::decode_directory(path.as_ref())?)
    }

    fn sort_slices(slices: &mut [SliceRecord]) {
        // Stable: duplicate order keys keep their input order.
        slices.sort_by_key(|slice| slice.order_key);
    }

    fn matches_dimensions(slice: &SliceRecord, width: usize, height: usize) -> bool {
        width > 0
            && height > 0
            && slice.width == width
            && slice.height == height
            && slice.is_consistent()
    }

    fn build_voxels(slices: Vec<SliceRecord>, slice_len: usize) -> Vec<i16> {
        let mut voxels = Vec::with_capacity(slice_len * slices.len());
        for slice in slices {
            voxels.extend_from_slice(&slice.samples);
        }
        voxels
    }
}
