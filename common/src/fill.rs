//! Fill level normalization.
//!
//! Bins report the depth of waste measured by the ultrasonic sensor in cm.
//! The dashboard shows that depth as a share of the bin height.

/// What to do with percentages outside of `0..=100` (sensor noise, wrong bin height).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ClampPolicy {
    #[default]
    Clamp,
    Passthrough,
}

impl ClampPolicy {
    pub fn from_flag(clamp: bool) -> Self {
        if clamp {
            Self::Clamp
        } else {
            Self::Passthrough
        }
    }
}

/// `round(fill_depth / bin_height * 100)`.
///
/// A missing or zero height yields 0 instead of dividing, as does a missing depth.
/// Note that 0 is a real value: it means the bin was just emptied.
pub fn normalize(fill_depth_cm: Option<f64>, bin_height_cm: Option<f64>, policy: ClampPolicy) -> i32 {
    let (Some(depth), Some(height)) = (fill_depth_cm, bin_height_cm) else {
        return 0;
    };
    if !depth.is_finite() || !height.is_finite() || height <= 0.0 {
        return 0;
    }

    // f64::round rounds half away from zero
    let pct = (depth / height * 100.0).round();
    let pct = pct.clamp(i32::MIN as f64, i32::MAX as f64) as i32;

    match policy {
        ClampPolicy::Clamp => pct.clamp(0, 100),
        ClampPolicy::Passthrough => pct,
    }
}
