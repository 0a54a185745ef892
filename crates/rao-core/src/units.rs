//! Units of measurement for thresholds, flows and setpoints.
//!
//! CNEC thresholds may be expressed in megawatts, amperes or percent of the
//! branch's permanent admissible current (Imax), while the objective function
//! works in a single flow unit. [`Unit`] tags every value crossing an API
//! boundary, and the [`Megawatts`] / [`Amperes`] / [`Kilovolts`] newtypes
//! carry the three-phase conversions between them:
//!
//! ```text
//! P [MW] = √3 · U [kV] · I [A] / 1000
//! ```
//!
//! # Usage
//!
//! ```
//! use rao_core::units::{Amperes, Kilovolts, Megawatts};
//!
//! let current = Amperes(1000.0);
//! let power = current.to_megawatts(Kilovolts(400.0));
//! assert!((power.value() - 692.82).abs() < 0.01);
//!
//! // This would NOT compile - different units
//! // let wrong = power + current;
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
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

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
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

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Absolute value
            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Check if value is NaN
            #[inline]
            pub fn is_nan(self) -> bool {
                self.0.is_nan()
            }
        }
    };
}

/// Unit tag attached to thresholds, flows, sensitivities and setpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Megawatt,
    Ampere,
    Kilovolt,
    Degree,
    PercentImax,
    Tap,
    SectionCount,
}

impl Unit {
    /// Units a flow (and thus a flow margin) can be expressed in.
    pub fn is_flow_unit(self) -> bool {
        matches!(self, Unit::Megawatt | Unit::Ampere)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Megawatt => "MW",
            Unit::Ampere => "A",
            Unit::Kilovolt => "kV",
            Unit::Degree => "°",
            Unit::PercentImax => "%Imax",
            Unit::Tap => "tap",
            Unit::SectionCount => "sections",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Active power in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Current in amperes (A)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit_ops!(Amperes, "A");

/// Voltage in kilovolts (kV)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_unit_ops!(Kilovolts, "kV");

impl Amperes {
    /// Three-phase active power carried by this current at the given voltage.
    #[inline]
    pub fn to_megawatts(self, nominal_voltage: Kilovolts) -> Megawatts {
        Megawatts(self.0 * nominal_voltage.0 * 3f64.sqrt() / 1000.0)
    }

    /// Current corresponding to a percentage of the given Imax.
    #[inline]
    pub fn from_percent_imax(percent: f64, i_max: Amperes) -> Amperes {
        Amperes(percent / 100.0 * i_max.0)
    }
}

impl Megawatts {
    /// Three-phase current carrying this power at the given voltage.
    ///
    /// Returns NaN for a zero voltage.
    #[inline]
    pub fn to_amperes(self, nominal_voltage: Kilovolts) -> Amperes {
        if nominal_voltage.0.abs() < 1e-12 {
            return Amperes(f64::NAN);
        }
        Amperes(self.0 * 1000.0 / (nominal_voltage.0 * 3f64.sqrt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_ampere_megawatt_round_trip() {
        let kv = Kilovolts(225.0);
        let i = Amperes(1500.0);
        let back = i.to_megawatts(kv).to_amperes(kv);
        assert!((back.value() - 1500.0).abs() < EPS);
    }

    #[test]
    fn test_known_conversion() {
        // 1000 A at 400 kV ≈ 692.82 MW
        let p = Amperes(1000.0).to_megawatts(Kilovolts(400.0));
        assert!((p.value() - 692.820_323).abs() < 1e-5);
    }

    #[test]
    fn test_zero_voltage_is_undefined() {
        assert!(Megawatts(100.0).to_amperes(Kilovolts(0.0)).is_nan());
    }

    #[test]
    fn test_percent_imax() {
        let i = Amperes::from_percent_imax(80.0, Amperes(2000.0));
        assert!((i.value() - 1600.0).abs() < EPS);
    }

    #[test]
    fn test_arithmetic() {
        let a = Megawatts(100.0);
        let b = Megawatts(30.0);
        assert_eq!((a - b).value(), 70.0);
        assert_eq!((a + b).value(), 130.0);
        assert_eq!((-a).value(), -100.0);
        assert_eq!((a * 2.0).value(), 200.0);
        assert_eq!((a / 4.0).value(), 25.0);
    }

    #[test]
    fn test_flow_units() {
        assert!(Unit::Megawatt.is_flow_unit());
        assert!(Unit::Ampere.is_flow_unit());
        assert!(!Unit::PercentImax.is_flow_unit());
        assert!(!Unit::Degree.is_flow_unit());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Megawatts(12.5)), "12.5000 MW");
        assert_eq!(format!("{}", Unit::Ampere), "A");
    }
}
