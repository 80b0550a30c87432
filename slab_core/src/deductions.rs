//! Corner Deductions for Slab Measurements
//!
//! A corner deduction is a rectangular area subtracted from a slab's gross
//! area to account for a damaged or trimmed corner. A slab carries between
//! zero and four of them ([`MAX_CORNER_DEDUCTIONS`]); an entry whose raw
//! dimensions are zero denotes "no deduction" and contributes nothing.
//!
//! Raw dimensions are stored in the slab's declared unit. The derived area
//! is always square feet, rounded to 4 decimal places, and is recomputed
//! whenever the raw dimensions or the slab's unit change.

use serde::{Deserialize, Serialize};

use crate::units::{convert_to_feet, MeasurementUnit, SqFt};

/// Physical slabs have four corners; entry past that is a data-entry slip.
///
/// The cap is enforced by the session layer, not by the area computation
/// itself, which stays total over any list it is handed.
pub const MAX_CORNER_DEDUCTIONS: usize = 4;

/// Coerce a raw entered dimension to something multipliable.
///
/// Invalid numeric input reaches the engine as NaN and is treated as zero,
/// keeping the computation chain unbreakable during incremental typing.
pub(crate) fn sanitize_dimension(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// A rectangular corner cut subtracted from a slab's gross area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CornerDeduction {
    /// Raw length in the slab's declared unit
    pub length: f64,

    /// Raw height in the slab's declared unit
    pub height: f64,

    /// Derived area in square feet, rounded to 4 decimals
    #[serde(default)]
    pub area: SqFt,
}

impl CornerDeduction {
    /// Create a deduction from raw dimensions; the area is derived once the
    /// declared unit is known (see [`CornerDeduction::recompute_area`]).
    pub fn new(length: f64, height: f64) -> Self {
        CornerDeduction {
            length,
            height,
            area: SqFt(0.0),
        }
    }

    /// A structurally present but zero-area entry ("no deduction").
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether this entry actually removes any area.
    pub fn has_deduction(&self) -> bool {
        self.area.value() > 0.0
    }

    /// Recompute the stored area from the raw dimensions under `unit`.
    pub fn recompute_area(&mut self, unit: MeasurementUnit) {
        self.area = corner_area(self.length, self.height, unit);
    }
}

/// Compute one corner's deduction area in square feet.
///
/// NaN inputs are coerced to zero before multiplication; the product is
/// rounded to 4 decimal places. For non-negative inputs the result is
/// always non-negative, so no clamping is needed.
///
/// # Example
///
/// ```rust
/// use slab_core::deductions::corner_area;
/// use slab_core::units::MeasurementUnit;
///
/// let area = corner_area(12.0, 12.0, MeasurementUnit::Inches);
/// assert_eq!(area.value(), 1.0);
/// ```
pub fn corner_area(length: f64, height: f64, unit: MeasurementUnit) -> SqFt {
    let l = convert_to_feet(sanitize_dimension(length), unit);
    let h = convert_to_feet(sanitize_dimension(height), unit);
    (l * h).round4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_area_inches() {
        // 12" x 12" = 1 ft x 1 ft = 1 sq ft
        assert_eq!(corner_area(12.0, 12.0, MeasurementUnit::Inches).value(), 1.0);
        // 6" x 12" = 0.5 sq ft
        assert_eq!(corner_area(6.0, 12.0, MeasurementUnit::Inches).value(), 0.5);
    }

    #[test]
    fn test_corner_area_cm() {
        // 30 cm -> 0.984252 ft per side, area rounds to 0.9688 sq ft
        let area = corner_area(30.0, 30.0, MeasurementUnit::Cm);
        assert!((area.value() - 0.9688).abs() < 1e-12);
    }

    #[test]
    fn test_zero_dimension_is_zero_area_not_error() {
        assert_eq!(corner_area(0.0, 12.0, MeasurementUnit::Inches).value(), 0.0);
        assert_eq!(corner_area(12.0, 0.0, MeasurementUnit::Inches).value(), 0.0);
    }

    #[test]
    fn test_nan_coerced_to_zero() {
        assert_eq!(corner_area(f64::NAN, 12.0, MeasurementUnit::Inches).value(), 0.0);
        assert_eq!(corner_area(12.0, f64::NAN, MeasurementUnit::Inches).value(), 0.0);
        assert_eq!(corner_area(f64::NAN, f64::NAN, MeasurementUnit::Cm).value(), 0.0);
    }

    #[test]
    fn test_recompute_under_new_unit() {
        let mut corner = CornerDeduction::new(12.0, 12.0);
        corner.recompute_area(MeasurementUnit::Inches);
        assert_eq!(corner.area.value(), 1.0);
        assert!(corner.has_deduction());

        // Same raw numbers reinterpreted as centimeters.
        corner.recompute_area(MeasurementUnit::Cm);
        let expected = corner_area(12.0, 12.0, MeasurementUnit::Cm);
        assert_eq!(corner.area, expected);
    }

    #[test]
    fn test_none_entry_has_no_deduction() {
        let mut corner = CornerDeduction::none();
        corner.recompute_area(MeasurementUnit::Inches);
        assert_eq!(corner.area.value(), 0.0);
        assert!(!corner.has_deduction());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut corner = CornerDeduction::new(6.0, 12.0);
        corner.recompute_area(MeasurementUnit::Inches);
        let json = serde_json::to_string(&corner).unwrap();
        let parsed: CornerDeduction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, corner);
    }
}
