//! Turns DICOM files into [`SliceRecord`]s.
//!
//! Only the fields the volume engine needs are read. Pixel data is decoded
//! from the first frame with the modality rescale applied (so CT data comes
//! out in Hounsfield units) and without any VOI LUT, then saturated into
//! `i16`.
//!
//! Directory loads read headers first and decode pixel data only for the
//! series with the most files.

use crate::{
    series_selector::dominant_key,
    slice_record::{PatientInfo, SliceRecord, Spacing, usable_series_key},
};

use dicom::{
    object::{DefaultDicomObject, OpenFileOptions, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use log::{debug, warn};
use ndarray::s;
use rayon::prelude::*;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Pixel data error: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),

    #[error("Pixel data has no frames")]
    NoFrames,
}

/// List the `.dcm` files directly inside `dir`, sorted by path.
pub fn collect_dicom_paths(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Decode the dominant series of the `.dcm` files directly inside `dir`.
pub fn decode_directory(dir: &Path) -> io::Result<Vec<SliceRecord>> {
    let paths = collect_dicom_paths(dir)?;
    Ok(decode_dominant_series(&paths))
}

/// Group `paths` by the Series Instance UID in their headers and decode only
/// the files of the largest group, ties going to the group seen first.
///
/// Files whose header cannot be read are skipped.
pub fn decode_dominant_series(paths: &[impl AsRef<Path> + Sync]) -> Vec<SliceRecord> {
    let keys: Vec<Option<String>> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            read_series_key(path).unwrap_or_else(|err| {
                warn!("skipping {}: {err}", path.display());
                None
            })
        })
        .collect();

    let usable = keys.iter().filter_map(|key| usable_series_key(key.as_deref()));
    let Some((best, count, series)) = dominant_key(usable) else {
        return Vec::new();
    };
    debug!("decoding series {best}: {count} of {} files, {series} series", paths.len());

    let chosen: Vec<&Path> = paths
        .iter()
        .zip(&keys)
        .filter(|(_, key)| usable_series_key(key.as_deref()) == Some(best))
        .map(|(path, _)| path.as_ref())
        .collect();
    decode_files(&chosen)
}

fn read_series_key(path: &Path) -> Result<Option<String>, DecodeError> {
    let header = OpenFileOptions::new()
        .read_until(tags::PIXEL_DATA)
        .open_file(path)?;
    Ok(string_of(&header, tags::SERIES_INSTANCE_UID))
}

/// Decode all files in parallel, skipping those that fail.
///
/// The result keeps the order of `paths`.
pub fn decode_files(paths: &[impl AsRef<Path> + Sync]) -> Vec<SliceRecord> {
    paths
        .par_iter()
        .filter_map(|path| {
            let path = path.as_ref();
            match decode_file(path) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    None
                }
            }
        })
        .collect()
}

pub fn decode_file(path: impl AsRef<Path>) -> Result<SliceRecord, DecodeError> {
    let object = open_file(path.as_ref())?;
    decode_object(&object)
}

pub fn decode_object(object: &DefaultDicomObject) -> Result<SliceRecord, DecodeError> {
    let series_key = string_of(object, tags::SERIES_INSTANCE_UID);
    let order_key = object
        .element(tags::INSTANCE_NUMBER)
        .ok()
        .and_then(|e| e.to_int::<i32>().ok())
        .unwrap_or(0);

    let pixel_data = object.decode_pixel_data()?;
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::Default)
        .with_voi_lut(VoiLutOption::Identity);
    // Rescaled values may leave the i16 range (16 bits stored, intercept
    // -1024), so convert wide and saturate.
    let frames = pixel_data.to_ndarray_with_options::<f32>(&options)?;
    if frames.dim().0 == 0 {
        return Err(DecodeError::NoFrames);
    }
    let image = frames.slice_move(s![0, .., .., 0]);
    let (height, width) = image.dim();
    let samples: Vec<i16> = image.iter().map(|&value| value.round() as i16).collect();

    let record = SliceRecord {
        series_key,
        order_key,
        width,
        height,
        samples,
        spacing: spacing_of(object),
        patient: Some(PatientInfo {
            name: string_of(object, tags::PATIENT_NAME).unwrap_or_default(),
            id: string_of(object, tags::PATIENT_ID).unwrap_or_default(),
        }),
    };
    debug!(
        "decoded instance {} ({width}x{height}) of series {:?}",
        record.order_key, record.series_key
    );
    Ok(record)
}

fn string_of(object: &DefaultDicomObject, tag: dicom::core::Tag) -> Option<String> {
    object
        .element(tag)
        .ok()?
        .to_str()
        .ok()
        .map(|value| value.trim_end_matches(['\0', ' ']).to_string())
}

/// Pixel Spacing is stored as (row spacing, column spacing), i.e. (y, x).
fn spacing_of(object: &DefaultDicomObject) -> Option<Spacing> {
    let pixel_spacing = object
        .element(tags::PIXEL_SPACING)
        .ok()
        .and_then(|e| e.to_multi_float64().ok())
        .filter(|values| values.len() >= 2);
    let thickness = object
        .element(tags::SLICE_THICKNESS)
        .ok()
        .and_then(|e| e.to_float64().ok());

    if pixel_spacing.is_none() && thickness.is_none() {
        return None;
    }
    let (y, x) = pixel_spacing.map_or((1.0, 1.0), |values| (values[0], values[1]));
    Some(Spacing::new(x, y, thickness.unwrap_or(1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{DataElement, PrimitiveValue, VR};
    use dicom::object::{FileMetaTableBuilder, InMemDicomObject};

    struct Image {
        series: &'static str,
        instance: Option<&'static str>,
        bits_stored: u16,
        signed: bool,
        pixels: Vec<u16>,
        rescale_intercept: Option<&'static str>,
        pixel_spacing: Option<[&'static str; 2]>,
        thickness: Option<&'static str>,
    }

    impl Default for Image {
        fn default() -> Self {
            Self {
                series: "1.2.3",
                instance: Some("7"),
                bits_stored: 16,
                signed: false,
                pixels: (0..6).collect(),
                rescale_intercept: None,
                pixel_spacing: None,
                thickness: None,
            }
        }
    }

    fn put_str(object: &mut InMemDicomObject, tag: dicom::core::Tag, vr: VR, value: &str) {
        object.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
    }

    fn put_u16(object: &mut InMemDicomObject, tag: dicom::core::Tag, value: u16) {
        object.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
    }

    /// A 3x2 MONOCHROME2 image.
    fn ct_object(image: Image) -> DefaultDicomObject {
        let mut object = InMemDicomObject::new_empty();
        put_str(&mut object, tags::SERIES_INSTANCE_UID, VR::UI, image.series);
        put_str(&mut object, tags::PATIENT_NAME, VR::PN, "Doe^Jane ");
        put_str(&mut object, tags::PATIENT_ID, VR::LO, "42");
        if let Some(instance) = image.instance {
            put_str(&mut object, tags::INSTANCE_NUMBER, VR::IS, instance);
        }
        if let Some([row, column]) = image.pixel_spacing {
            object.put(DataElement::new(
                tags::PIXEL_SPACING,
                VR::DS,
                PrimitiveValue::Strs(vec![row.to_string(), column.to_string()].into()),
            ));
        }
        if let Some(thickness) = image.thickness {
            put_str(&mut object, tags::SLICE_THICKNESS, VR::DS, thickness);
        }
        if let Some(intercept) = image.rescale_intercept {
            put_str(&mut object, tags::RESCALE_INTERCEPT, VR::DS, intercept);
            put_str(&mut object, tags::RESCALE_SLOPE, VR::DS, "1");
        }
        put_u16(&mut object, tags::ROWS, 2);
        put_u16(&mut object, tags::COLUMNS, 3);
        put_u16(&mut object, tags::SAMPLES_PER_PIXEL, 1);
        put_u16(&mut object, tags::BITS_ALLOCATED, 16);
        put_u16(&mut object, tags::BITS_STORED, image.bits_stored);
        put_u16(&mut object, tags::HIGH_BIT, image.bits_stored - 1);
        put_u16(&mut object, tags::PIXEL_REPRESENTATION, image.signed as u16);
        put_str(&mut object, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
        object.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::U16(image.pixels.into()),
        ));

        object
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax("1.2.840.10008.1.2.1")
                    .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
                    .media_storage_sop_instance_uid("1.2.3.4.5"),
            )
            .unwrap()
    }

    #[test]
    fn decodes_geometry_and_keys() {
        let record = decode_object(&ct_object(Image {
            series: "1.2.3\0",
            pixel_spacing: Some(["0.5", "0.8"]),
            thickness: Some("2.5"),
            ..Image::default()
        }))
        .unwrap();

        assert_eq!(record.series_key.as_deref(), Some("1.2.3"));
        assert_eq!(record.order_key, 7);
        assert_eq!((record.width, record.height), (3, 2));
        assert_eq!(record.samples, vec![0, 1, 2, 3, 4, 5]);
        // Pixel Spacing is (row, column): rows are 0.5 apart, columns 0.8.
        assert_eq!(record.spacing, Some(Spacing::new(0.8, 0.5, 2.5)));
        assert_eq!(
            record.patient,
            Some(PatientInfo {
                name: "Doe^Jane".into(),
                id: "42".into(),
            })
        );
    }

    #[test]
    fn missing_attributes_fall_back() {
        let record = decode_object(&ct_object(Image {
            instance: None,
            thickness: Some("3"),
            ..Image::default()
        }))
        .unwrap();
        assert_eq!(record.order_key, 0);
        assert_eq!(record.spacing, Some(Spacing::new(1.0, 1.0, 3.0)));

        let record = decode_object(&ct_object(Image::default())).unwrap();
        assert_eq!(record.spacing, None);
    }

    #[test]
    fn rescale_of_16_bit_unsigned_data_saturates() {
        let record = decode_object(&ct_object(Image {
            pixels: vec![0, 1024, 3096, 40000, 65535, 1],
            rescale_intercept: Some("-1024"),
            ..Image::default()
        }))
        .unwrap();
        assert_eq!(record.samples, vec![-1024, 0, 2072, 32767, 32767, -1023]);
    }

    #[test]
    fn rescale_of_16_bit_signed_data_saturates() {
        let raw: [i16; 6] = [-2000, 0, 1000, i16::MIN, i16::MAX, -1];
        let record = decode_object(&ct_object(Image {
            signed: true,
            pixels: raw.iter().map(|&v| v as u16).collect(),
            rescale_intercept: Some("-1024"),
            ..Image::default()
        }))
        .unwrap();
        assert_eq!(record.samples, vec![-3024, -1024, -24, -32768, 31743, -1025]);
    }

    #[test]
    fn rescale_of_12_bit_data() {
        let record = decode_object(&ct_object(Image {
            bits_stored: 12,
            pixels: vec![3096, 0, 1024, 4095, 2048, 1],
            rescale_intercept: Some("-1024"),
            ..Image::default()
        }))
        .unwrap();
        assert_eq!(record.samples, vec![2072, -1024, 0, 3071, 1024, -1023]);
    }

    #[test]
    fn directory_decodes_only_the_dominant_series() {
        let dir = scratch_dir("series");
        let files = [
            ("a.dcm", "1.2.ct", "2"),
            ("b.dcm", "1.2.scout", "1"),
            ("c.dcm", "1.2.ct", "1"),
        ];
        for (name, series, instance) in files {
            ct_object(Image {
                series,
                instance: Some(instance),
                ..Image::default()
            })
            .write_to_file(dir.join(name))
            .unwrap();
        }
        fs::write(dir.join("d.dcm"), b"not DICOM").unwrap();

        let records = decode_directory(&dir).unwrap();
        let keys: Vec<_> = records
            .iter()
            .map(|r| (r.series_key.as_deref().unwrap(), r.order_key))
            .collect();
        assert_eq!(keys, vec![("1.2.ct", 2), ("1.2.ct", 1)]);

        fs::remove_dir_all(&dir).unwrap();
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dicom-mpr-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn collects_only_dcm_files_in_order() {
        let dir = scratch_dir("collect");
        for name in ["b.dcm", "a.DCM", "notes.txt", "c.dcm.bak"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        fs::create_dir(dir.join("nested.dcm")).unwrap();

        let paths = collect_dicom_paths(&dir).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.DCM", "b.dcm"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn undecodable_files_are_skipped() {
        let dir = scratch_dir("garbage");
        let path = dir.join("broken.dcm");
        fs::write(&path, b"definitely not DICOM").unwrap();

        assert!(decode_file(&path).is_err());
        assert!(decode_files(&[path]).is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = std::env::temp_dir().join("dicom-mpr-does-not-exist");
        assert!(collect_dicom_paths(&dir).is_err());
    }
}
