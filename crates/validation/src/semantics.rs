//! Attribute-aware error measures.
//!
//! Every attribute falls into one [`AttributeClass`]; the class alone decides
//! how the difference is measured and whether a percent error is reported.

use serde::Serialize;

/// Added to the reference value before dividing, so a zero reference yields a
/// large but finite percent error instead of a division fault. Near zero the
/// result is an approximation, not a true percent error. A reference of exactly
/// `-PERCENT_EPSILON` still zeroes the denominator; that percent error is `None`.
pub const PERCENT_EPSILON: f64 = 1e-6;

/// Azimuth reported for surfaces with no defined orientation (flat roofs).
pub const AZIMUTH_UNDEFINED: f64 = -1.0;

const FULL_TURN: f64 = 360.0;
const HALF_TURN: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeClass {
    /// Heights and areas: signed difference, stabilized percent error.
    Linear,
    /// Tilt (0..=90 deg): signed difference, no percent error.
    BoundedAngle,
    /// Azimuth (0..360 deg): shortest-arc distance, no percent error.
    CircularAngle,
    /// Anything else: signed difference, no percent error.
    Unclassified,
}

/// Known attribute names and their class.
const ATTRIBUTE_CLASSES: &[(&str, AttributeClass)] = &[
    ("min_height", AttributeClass::Linear),
    ("max_height", AttributeClass::Linear),
    ("height", AttributeClass::Linear),
    ("surface_area", AttributeClass::Linear),
    ("area", AttributeClass::Linear),
    ("footprint_area", AttributeClass::Linear),
    ("tilt", AttributeClass::BoundedAngle),
    ("azimuth", AttributeClass::CircularAngle),
];

impl AttributeClass {
    pub fn of(attribute_name: &str) -> Self {
        ATTRIBUTE_CLASSES
            .iter()
            .find(|(name, _)| *name == attribute_name)
            .map(|(_, class)| *class)
            .unwrap_or(Self::Unclassified)
    }

    pub fn has_percent_error(&self) -> bool {
        matches!(self, Self::Linear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMeasure {
    pub difference: f64,
    pub percent_error: Option<f64>,
}

/// Measure the error of `calculated` against `reference` for `attribute_name`.
///
/// Returns `None` when the pair is not a valid comparison (an azimuth with the
/// undefined sentinel on either side).
pub fn compute(attribute_name: &str, calculated: f64, reference: f64) -> Option<ErrorMeasure> {
    compute_for_class(AttributeClass::of(attribute_name), calculated, reference)
}

pub fn compute_for_class(
    class: AttributeClass,
    calculated: f64,
    reference: f64,
) -> Option<ErrorMeasure> {
    match class {
        AttributeClass::Linear => {
            let difference = calculated - reference;
            let percent = difference / (reference + PERCENT_EPSILON) * 100.0;
            Some(ErrorMeasure {
                difference,
                percent_error: percent.is_finite().then_some(percent),
            })
        }
        AttributeClass::BoundedAngle | AttributeClass::Unclassified => Some(ErrorMeasure {
            difference: calculated - reference,
            percent_error: None,
        }),
        AttributeClass::CircularAngle => {
            if calculated == AZIMUTH_UNDEFINED || reference == AZIMUTH_UNDEFINED {
                return None;
            }
            Some(ErrorMeasure {
                difference: circular_distance(calculated, reference),
                percent_error: None,
            })
        }
    }
}

/// Shortest-arc distance between two bearings in degrees, in `[0, 180]`.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let raw = (a - b).abs() % FULL_TURN;
    if raw > HALF_TURN {
        FULL_TURN - raw
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn classes_by_name() {
        assert_eq!(AttributeClass::of("min_height"), AttributeClass::Linear);
        assert_eq!(AttributeClass::of("footprint_area"), AttributeClass::Linear);
        assert_eq!(AttributeClass::of("tilt"), AttributeClass::BoundedAngle);
        assert_eq!(AttributeClass::of("azimuth"), AttributeClass::CircularAngle);
        assert_eq!(AttributeClass::of("volume"), AttributeClass::Unclassified);
    }

    #[test]
    fn linear_difference_and_percent() {
        let m = compute("surface_area", 12.0, 10.0).unwrap();
        assert_eq!(m.difference, 2.0);
        assert!(approx(m.percent_error.unwrap(), 20.0, 1e-4));
    }

    #[test]
    fn linear_zero_reference_stays_finite() {
        let m = compute("min_height", 0.5, 0.0).unwrap();
        assert_eq!(m.difference, 0.5);
        let pct = m.percent_error.unwrap();
        assert!(pct.is_finite());
        assert!(approx(pct, 0.5 / PERCENT_EPSILON * 100.0, 1e-3));
    }

    #[test]
    fn linear_zero_denominator_has_no_percent() {
        let m = compute("surface_area", 5.0, -PERCENT_EPSILON).unwrap();
        assert_eq!(m.difference, 5.0 + PERCENT_EPSILON);
        assert_eq!(m.percent_error, None);

        let m = compute("surface_area", -PERCENT_EPSILON, -PERCENT_EPSILON).unwrap();
        assert_eq!(m.difference, 0.0);
        assert_eq!(m.percent_error, None);
    }

    #[test]
    fn tilt_has_no_percent_error() {
        let m = compute("tilt", 35.0, 30.0).unwrap();
        assert_eq!(m.difference, 5.0);
        assert_eq!(m.percent_error, None);

        let m = compute("tilt", 0.0, 0.0).unwrap();
        assert_eq!(m.percent_error, None);
    }

    #[test]
    fn azimuth_wraps_around() {
        let m = compute("azimuth", 350.0, 10.0).unwrap();
        assert_eq!(m.difference, 20.0);
        assert_eq!(m.percent_error, None);

        let m = compute("azimuth", 10.0, 350.0).unwrap();
        assert_eq!(m.difference, 20.0);
    }

    #[test]
    fn azimuth_opposite_is_maximal() {
        let m = compute("azimuth", 0.0, 180.0).unwrap();
        assert_eq!(m.difference, 180.0);
    }

    #[test]
    fn azimuth_sentinel_excluded() {
        assert!(compute("azimuth", -1.0, 90.0).is_none());
        assert!(compute("azimuth", 90.0, -1.0).is_none());
        assert!(compute("azimuth", -1.0, -1.0).is_none());
    }

    #[test]
    fn sentinel_only_applies_to_azimuth() {
        let m = compute("tilt", -1.0, 10.0).unwrap();
        assert_eq!(m.difference, -11.0);
    }

    #[test]
    fn unclassified_falls_back_to_linear_without_percent() {
        let m = compute("volume", 110.0, 100.0).unwrap();
        assert_eq!(m.difference, 10.0);
        assert_eq!(m.percent_error, None);
    }

    proptest! {
        #[test]
        fn circular_distance_within_half_turn(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            let d = circular_distance(a, b);
            prop_assert!((0.0..=180.0).contains(&d));
            prop_assert!((d - circular_distance(b, a)).abs() < 1e-9);
        }
    }
}
