/// Physical size of a voxel in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spacing {
    pub x: f64,
    pub y: f64,
    pub thickness: f64,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            thickness: 1.0,
        }
    }
}

impl Spacing {
    pub fn new(x: f64, y: f64, thickness: f64) -> Self {
        Self { x, y, thickness }
    }

    /// Replace every non-positive or non-finite component with `1.0`.
    pub fn sanitized(self) -> Self {
        #[inline]
        fn or_one(value: f64) -> f64 {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                1.0
            }
        }
        Self {
            x: or_one(self.x),
            y: or_one(self.y),
            thickness: or_one(self.thickness),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientInfo {
    pub name: String,
    pub id: String,
}

/// A series key that is missing or blank cannot group slices.
pub fn usable_series_key(key: Option<&str>) -> Option<&str> {
    key.filter(|key| !key.trim().is_empty())
}

/// One decoded 2D image, tagged with the keys used to stack it.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceRecord {
    /// Series level identifier. `None` or an empty string is not usable.
    pub series_key: Option<String>,
    /// Acquisition order within the series (instance number).
    pub order_key: i32,
    pub width: usize,
    pub height: usize,
    /// Row-major samples, `width * height` long.
    pub samples: Vec<i16>,
    /// Spacing as declared by the file; `None` where the decoder found nothing.
    pub spacing: Option<Spacing>,
    pub patient: Option<PatientInfo>,
}

impl SliceRecord {
    pub fn new(
        series_key: impl Into<String>,
        order_key: i32,
        width: usize,
        height: usize,
        samples: Vec<i16>,
    ) -> Self {
        Self {
            series_key: Some(series_key.into()),
            order_key,
            width,
            height,
            samples,
            spacing: None,
            patient: None,
        }
    }

    pub fn with_spacing(mut self, spacing: Spacing) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn with_patient(mut self, patient: PatientInfo) -> Self {
        self.patient = Some(patient);
        self
    }

    pub fn usable_series_key(&self) -> Option<&str> {
        usable_series_key(self.series_key.as_deref())
    }

    /// Whether the record's sample buffer agrees with its declared size.
    pub fn is_consistent(&self) -> bool {
        self.width
            .checked_mul(self.height)
            .is_some_and(|len| len == self.samples.len())
    }
}
