//! # Measurement Units
//!
//! Declared-unit handling for slab measurements, plus type-safe wrappers for
//! the derived quantities. Supervisors enter raw dimensions in whatever unit
//! the tape at the yard reads (inches, centimeters, millimeters); every
//! derived area is carried in square feet, the unit the trade bills in.
//!
//! ## Design Philosophy
//!
//! We use simple newtype wrappers rather than a full units library because:
//! - The dispatch workflow uses exactly one output unit (square feet)
//! - We want JSON serialization to be clean (just numbers)
//! - Minimal runtime overhead
//!
//! ## Conversion Table
//!
//! | Declared unit | Factor to feet |
//! |---------------|----------------|
//! | inches        | 1/12           |
//! | cm            | 0.0328084      |
//! | mm            | 1.0 (identity) |
//!
//! The identity factor for millimeters is preserved source behavior: the
//! live computation path only ever defined inches and cm, and anything else
//! passes through as already-feet. See DESIGN.md before "fixing" this.
//!
//! ## Example
//!
//! ```rust
//! use slab_core::units::{convert_to_feet, Feet, MeasurementUnit, SqFt};
//!
//! let length = convert_to_feet(120.0, MeasurementUnit::Inches);
//! let height = convert_to_feet(60.0, MeasurementUnit::Inches);
//! assert_eq!(length, Feet(10.0));
//!
//! let gross: SqFt = length * height;
//! assert_eq!(gross.value(), 50.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Declared Measurement Unit
// ============================================================================

/// Centimeters-to-feet conversion factor used by the dispatch workflow.
pub const CM_TO_FEET: f64 = 0.0328084;

/// The unit a slab's raw length/height/thickness were entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MeasurementUnit {
    /// Inches (factor 1/12 to feet)
    #[default]
    Inches,
    /// Centimeters (factor 0.0328084 to feet)
    Cm,
    /// Millimeters: identity factor, treated as already-feet (see module doc)
    Mm,
}

impl MeasurementUnit {
    pub const ALL: [MeasurementUnit; 3] = [
        MeasurementUnit::Inches,
        MeasurementUnit::Cm,
        MeasurementUnit::Mm,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            MeasurementUnit::Inches => "Inches",
            MeasurementUnit::Cm => "Centimeters",
            MeasurementUnit::Mm => "Millimeters",
        }
    }

    /// Short label used in tables and PDF column headers.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            MeasurementUnit::Inches => "in",
            MeasurementUnit::Cm => "cm",
            MeasurementUnit::Mm => "mm",
        }
    }

    /// Parse user input such as `"in"`, `"inches"`, `"CM"`, `"mm"`.
    ///
    /// Returns `None` for anything unrecognized; callers decide whether to
    /// re-prompt or fall back to a default.
    pub fn parse(input: &str) -> Option<MeasurementUnit> {
        match input.trim().to_ascii_lowercase().as_str() {
            "in" | "inch" | "inches" => Some(MeasurementUnit::Inches),
            "cm" | "centimeter" | "centimeters" => Some(MeasurementUnit::Cm),
            "mm" | "millimeter" | "millimeters" => Some(MeasurementUnit::Mm),
            _ => None,
        }
    }
}

impl std::fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Convert a raw entered value to feet under the declared unit.
///
/// This is a total function: it never rejects its input. Negative values
/// pass through (validation is a caller concern), and NaN passes through
/// here; the area functions in [`crate::measure`] coerce NaN to zero
/// before multiplying.
///
/// # Example
///
/// ```rust
/// use slab_core::units::{convert_to_feet, MeasurementUnit};
///
/// assert_eq!(convert_to_feet(120.0, MeasurementUnit::Inches).value(), 10.0);
/// assert_eq!(convert_to_feet(100.0, MeasurementUnit::Cm).value(), 3.28084);
/// // Millimeters keep the identity factor (preserved source behavior):
/// assert_eq!(convert_to_feet(7.5, MeasurementUnit::Mm).value(), 7.5);
/// ```
pub fn convert_to_feet(value: f64, unit: MeasurementUnit) -> Feet {
    match unit {
        MeasurementUnit::Inches => Feet(value / 12.0),
        MeasurementUnit::Cm => Feet(value * CM_TO_FEET),
        MeasurementUnit::Mm => Feet(value),
    }
}

// ============================================================================
// Length and Area Newtypes
// ============================================================================

/// Length in feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feet(pub f64);

/// Area in square feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqFt(pub f64);

/// Two lengths in feet multiply into an area in square feet.
impl Mul for Feet {
    type Output = SqFt;
    fn mul(self, rhs: Feet) -> SqFt {
        SqFt(self.0 * rhs.0)
    }
}

impl SqFt {
    /// Round to 4 decimal places, the precision dispatch records carry.
    pub fn round4(self) -> SqFt {
        SqFt((self.0 * 10_000.0).round() / 10_000.0)
    }

    /// Clamp a derived area at zero (net area is never negative).
    pub fn clamp_non_negative(self) -> SqFt {
        SqFt(self.0.max(0.0))
    }
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Feet);
impl_arithmetic!(SqFt);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inches_to_feet() {
        assert_eq!(convert_to_feet(120.0, MeasurementUnit::Inches).value(), 10.0);
        assert_eq!(convert_to_feet(60.0, MeasurementUnit::Inches).value(), 5.0);
        assert_eq!(convert_to_feet(12.0, MeasurementUnit::Inches).value(), 1.0);
    }

    #[test]
    fn test_cm_to_feet() {
        let ft = convert_to_feet(100.0, MeasurementUnit::Cm);
        assert!((ft.value() - 3.28084).abs() < 1e-12);
    }

    #[test]
    fn test_mm_identity_fallback() {
        // The live conversion table never defined mm; values pass through.
        assert_eq!(convert_to_feet(250.0, MeasurementUnit::Mm).value(), 250.0);
    }

    #[test]
    fn test_zero_and_negative_pass_through() {
        assert_eq!(convert_to_feet(0.0, MeasurementUnit::Inches).value(), 0.0);
        // Negative input is not rejected at this layer.
        assert_eq!(convert_to_feet(-24.0, MeasurementUnit::Inches).value(), -2.0);
    }

    #[test]
    fn test_feet_multiplication_gives_area() {
        let area = Feet(10.0) * Feet(5.0);
        assert_eq!(area, SqFt(50.0));
    }

    #[test]
    fn test_round4() {
        assert_eq!(SqFt(10.76391110).round4().value(), 10.7639);
        assert_eq!(SqFt(0.00004).round4().value(), 0.0);
        assert_eq!(SqFt(0.00005).round4().value(), 0.0001);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(SqFt(-3.0).clamp_non_negative().value(), 0.0);
        assert_eq!(SqFt(3.0).clamp_non_negative().value(), 3.0);
    }

    #[test]
    fn test_arithmetic() {
        let a = SqFt(10.0);
        let b = SqFt(5.0);
        assert_eq!((a + b).0, 15.0);
        assert_eq!((a - b).0, 5.0);
        assert_eq!((a * 2.0).0, 20.0);
        assert_eq!((a / 2.0).0, 5.0);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!(MeasurementUnit::parse("in"), Some(MeasurementUnit::Inches));
        assert_eq!(MeasurementUnit::parse(" CM "), Some(MeasurementUnit::Cm));
        assert_eq!(MeasurementUnit::parse("millimeters"), Some(MeasurementUnit::Mm));
        assert_eq!(MeasurementUnit::parse("furlongs"), None);

        // Every unit's abbreviation parses back to itself.
        for unit in MeasurementUnit::ALL {
            assert_eq!(MeasurementUnit::parse(unit.abbreviation()), Some(unit));
        }
    }

    #[test]
    fn test_serialization() {
        let area = SqFt(49.0);
        let json = serde_json::to_string(&area).unwrap();
        assert_eq!(json, "49.0");

        let roundtrip: SqFt = serde_json::from_str(&json).unwrap();
        assert_eq!(area, roundtrip);

        let unit_json = serde_json::to_string(&MeasurementUnit::Cm).unwrap();
        assert_eq!(unit_json, "\"Cm\"");
    }
}
