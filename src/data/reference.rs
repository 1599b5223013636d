//! Embedded reference measurements.
//!
//! Pseudo-data generated around `A0 = 1000`, `λ = 0.1 / day`. The table is a
//! value, not a global: callers receive an owned [`Dataset`] and may substitute
//! their own.

use crate::domain::{DataPoint, Dataset, DecayParams};

/// Parameters the reference table was generated from.
pub const REFERENCE_TRUTH: DecayParams = DecayParams::new(0.1, 1000.0);

/// `(observed, t, err_minus, err_plus)`
const REFERENCE_POINTS: [DataPoint; 9] = [
    DataPoint::new(995.0, 0.0, 30.0, 30.0),
    DataPoint::new(615.0, 5.0, 20.0, 20.0),
    DataPoint::new(375.0, 10.0, 15.0, 15.0),
    DataPoint::new(220.0, 15.0, 10.0, 10.0),
    DataPoint::new(140.0, 20.0, 8.0, 8.0),
    DataPoint::new(85.0, 25.0, 5.0, 5.0),
    DataPoint::new(51.0, 30.0, 4.0, 4.0),
    DataPoint::new(32.0, 35.0, 3.0, 3.0),
    DataPoint::new(17.5, 40.0, 2.0, 2.0),
];

impl Dataset {
    /// The nine embedded reference measurements.
    pub fn reference() -> Dataset {
        Dataset::new_unchecked(REFERENCE_POINTS.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_has_nine_ordered_points() {
        let ds = Dataset::reference();
        assert_eq!(ds.len(), 9);
        for w in ds.points().windows(2) {
            assert!(w[0].t < w[1].t);
        }
    }

    #[test]
    fn reference_table_passes_validation() {
        let checked = Dataset::new(REFERENCE_POINTS.to_vec()).unwrap();
        assert_eq!(checked, Dataset::reference());
    }
}
