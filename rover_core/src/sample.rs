//! Validated distance readings.

/// Distance reported before the first valid reading, far enough to never be
/// a hazard.
pub const SAFE_DISTANCE_CM: f64 = 999.0;

/// A forward distance in centimeters that passed the validity window, or the
/// startup sentinel. Constructed only through [`ValidRange::admit`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DistanceSample(f64);

impl DistanceSample {
    pub const SENTINEL: Self = Self(SAFE_DISTANCE_CM);

    #[inline]
    pub fn cm(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }
}

impl Default for DistanceSample {
    fn default() -> Self {
        Self::SENTINEL
    }
}

impl std::fmt::Display for DistanceSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} cm", self.0)
    }
}

/// Inclusive window `[min_cm, max_cm]` of physically meaningful readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    pub min_cm: f64,
    pub max_cm: f64,
}

impl Default for ValidRange {
    fn default() -> Self {
        Self {
            min_cm: 2.0,
            max_cm: 250.0,
        }
    }
}

impl ValidRange {
    /// `None` unless both bounds are finite, non-negative and `min < max`.
    pub fn new(min_cm: f64, max_cm: f64) -> Option<Self> {
        let ok = min_cm.is_finite() && max_cm.is_finite() && min_cm >= 0.0 && min_cm < max_cm;
        ok.then_some(Self { min_cm, max_cm })
    }

    #[inline]
    pub fn contains(&self, cm: f64) -> bool {
        cm.is_finite() && cm >= self.min_cm && cm <= self.max_cm
    }

    /// Turn a raw reading into a sample. No reading, NaN, infinities and
    /// out-of-window values are rejected; accepted values are kept as is.
    pub fn admit(&self, reading: Option<f64>) -> Option<DistanceSample> {
        reading.filter(|&cm| self.contains(cm)).map(DistanceSample)
    }
}
