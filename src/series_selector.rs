use std::collections::HashMap;

use log::debug;

use crate::{slice_record::SliceRecord, volume_loader::VolumeLoaderError};

/// Keep only the records of the series with the most candidates.
///
/// Ties go to the series whose first record appears earliest in `candidates`.
/// Records without a usable series key never take part.
///
/// # Errors
///
/// Returns [`VolumeLoaderError::EmptyInput`] if `candidates` is empty or no
/// record carries a usable series key.
pub fn select_dominant_series(
    candidates: Vec<SliceRecord>,
) -> Result<Vec<SliceRecord>, VolumeLoaderError> {
    let (best_key, best_count, series) =
        dominant_key(candidates.iter().filter_map(SliceRecord::usable_series_key))
            .ok_or(VolumeLoaderError::EmptyInput)?;
    debug!(
        "selected series {best_key} ({best_count} of {} candidates, {series} series)",
        candidates.len()
    );

    let best_key = best_key.to_owned();
    Ok(candidates
        .into_iter()
        .filter(|record| record.usable_series_key() == Some(best_key.as_str()))
        .collect())
}

/// Most frequent key, its count and the number of distinct keys.
///
/// Ties go to the key seen first. `None` when `keys` is empty.
pub fn dominant_key<'a>(
    keys: impl IntoIterator<Item = &'a str>,
) -> Option<(&'a str, usize, usize)> {
    let mut first_seen: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        let count = counts.entry(key).or_insert_with(|| {
            first_seen.push(key);
            0
        });
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for key in first_seen {
        let count = counts[&key];
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((key, count));
        }
    }
    best.map(|(key, count)| (key, count, counts.len()))
}
