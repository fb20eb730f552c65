//! Conversion between reduced and augmented cart-pole states.
//!
//! - reduced: `[x, x', theta, theta']`, the physical representation
//! - augmented: `[x, x', sin(theta), cos(theta), theta']`, continuous across
//!   the angle wrap-around and therefore what the optimizer works on
//!
//! Single vectors and batches (one sample per row) have separate entry
//! points. Batches are converted row by row through the single-vector
//! functions, so a one-row batch is bit-for-bit identical to the vector form.
//! The `*_rows` and `*_slice` variants accept runtime-shaped input and report
//! a wrong width as [`CpError::Shape`].

use cp_core::{CpError, CpResult, angle_from_sin_cos};
use nalgebra::{DMatrix, Dyn, OMatrix, SVector, U4, U5};

pub const REDUCED_STATE_SIZE: usize = 4;
pub const STATE_SIZE: usize = 5;
pub const CONTROL_SIZE: usize = 1;

/// `[x, x', theta, theta']`
pub type ReducedState = SVector<f64, REDUCED_STATE_SIZE>;
/// `[x, x', sin(theta), cos(theta), theta']`
pub type AugmentedState = SVector<f64, STATE_SIZE>;
/// `[F]`, horizontal force on the cart (N)
pub type Control = SVector<f64, CONTROL_SIZE>;

/// Reduced states, one per row.
pub type ReducedBatch = OMatrix<f64, Dyn, U4>;
/// Augmented states, one per row.
pub type AugmentedBatch = OMatrix<f64, Dyn, U5>;

/// `[x, x', theta, theta'] -> [x, x', sin(theta), cos(theta), theta']`
pub fn augment_state(state: &ReducedState) -> AugmentedState {
    let theta = state[2];
    AugmentedState::new(state[0], state[1], theta.sin(), theta.cos(), state[3])
}

/// `[x, x', sin(theta), cos(theta), theta'] -> [x, x', theta, theta']`
///
/// The angle is recovered with `atan2` and lands in `(-pi, pi]` whatever
/// the angle that produced the sine/cosine pair.
pub fn reduce_state(state: &AugmentedState) -> ReducedState {
    let theta = angle_from_sin_cos(state[2], state[3]);
    ReducedState::new(state[0], state[1], theta, state[4])
}

pub fn augment_batch(states: &ReducedBatch) -> AugmentedBatch {
    let mut out = AugmentedBatch::zeros(states.nrows());
    for (i, row) in states.row_iter().enumerate() {
        out.set_row(i, &augment_state(&row.transpose()).transpose());
    }
    out
}

pub fn reduce_batch(states: &AugmentedBatch) -> ReducedBatch {
    let mut out = ReducedBatch::zeros(states.nrows());
    for (i, row) in states.row_iter().enumerate() {
        out.set_row(i, &reduce_state(&row.transpose()).transpose());
    }
    out
}

/// [`augment_batch`] for a matrix whose width is only known at runtime.
pub fn augment_rows(states: &DMatrix<f64>) -> CpResult<DMatrix<f64>> {
    if states.ncols() != REDUCED_STATE_SIZE {
        return Err(CpError::shape(
            "reduced state columns",
            REDUCED_STATE_SIZE,
            states.ncols(),
        ));
    }
    let mut out = DMatrix::zeros(states.nrows(), STATE_SIZE);
    for (i, row) in states.row_iter().enumerate() {
        let s = ReducedState::from_iterator(row.iter().copied());
        out.row_mut(i).copy_from_slice(augment_state(&s).as_slice());
    }
    Ok(out)
}

/// [`reduce_batch`] for a matrix whose width is only known at runtime.
pub fn reduce_rows(states: &DMatrix<f64>) -> CpResult<DMatrix<f64>> {
    if states.ncols() != STATE_SIZE {
        return Err(CpError::shape(
            "augmented state columns",
            STATE_SIZE,
            states.ncols(),
        ));
    }
    let mut out = DMatrix::zeros(states.nrows(), REDUCED_STATE_SIZE);
    for (i, row) in states.row_iter().enumerate() {
        let s = AugmentedState::from_iterator(row.iter().copied());
        out.row_mut(i).copy_from_slice(reduce_state(&s).as_slice());
    }
    Ok(out)
}

/// [`augment_state`] for a flat slice of length 4.
pub fn augment_slice(state: &[f64]) -> CpResult<AugmentedState> {
    if state.len() != REDUCED_STATE_SIZE {
        return Err(CpError::shape("reduced state", REDUCED_STATE_SIZE, state.len()));
    }
    Ok(augment_state(&ReducedState::from_column_slice(state)))
}

/// [`reduce_state`] for a flat slice of length 5.
pub fn reduce_slice(state: &[f64]) -> CpResult<ReducedState> {
    if state.len() != STATE_SIZE {
        return Err(CpError::shape("augmented state", STATE_SIZE, state.len()));
    }
    Ok(reduce_state(&AugmentedState::from_column_slice(state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::{FRAC_PI_2, PI};
    use cp_core::wrap_angle;

    #[test]
    fn augment_replaces_angle_column() {
        let a = augment_state(&ReducedState::new(1.0, -2.0, FRAC_PI_2, 0.5));
        assert_eq!(a[0], 1.0);
        assert_eq!(a[1], -2.0);
        assert!((a[2] - 1.0).abs() < 1e-15);
        assert!(a[3].abs() < 1e-15);
        assert_eq!(a[4], 0.5);
    }

    #[test]
    fn reduce_normalizes_angle() {
        let r = reduce_state(&augment_state(&ReducedState::new(0.0, 0.0, 3.0 * PI, 0.0)));
        assert!((r[2] - PI).abs() < 1e-12, "3pi reduced to {}", r[2]);

        for theta in [-7.0, -PI + 0.01, 4.0, 10.0] {
            let r = reduce_state(&augment_state(&ReducedState::new(0.0, 0.0, theta, 0.0)));
            assert!((r[2] - wrap_angle(theta)).abs() < 1e-12);
        }
    }

    #[test]
    fn reduce_never_returns_minus_pi() {
        let r = reduce_state(&AugmentedState::new(0.0, 0.0, -0.0, -1.0, 0.0));
        assert_eq!(r[2], PI);
    }

    #[test]
    fn augment_of_reduce_only_round_trips_canonical_states() {
        let a = augment_state(&ReducedState::new(0.3, 0.1, 2.0, -1.0));
        let back = augment_state(&reduce_state(&a));
        assert!((back - a).norm() < 1e-12);
    }

    #[test]
    fn single_row_batch_matches_vector() {
        let s = ReducedState::new(0.5, -1.5, 2.5, 0.25);
        let batch = ReducedBatch::from_row_slice(s.as_slice());
        let aug = augment_batch(&batch);
        assert_eq!(aug.nrows(), 1);
        assert_eq!(aug.row(0).transpose(), augment_state(&s));

        let red = reduce_batch(&aug);
        assert_eq!(red.row(0).transpose(), reduce_state(&augment_state(&s)));
    }

    #[test]
    fn multi_row_batch_is_row_wise() {
        let batch = ReducedBatch::from_row_slice(&[
            0.0, 0.0, 0.0, 0.0, //
            1.0, 2.0, -1.0, 3.0, //
            -4.0, 0.5, 3.0, -0.2,
        ]);
        let aug = augment_batch(&batch);
        assert_eq!(aug.nrows(), 3);
        for (i, row) in batch.row_iter().enumerate() {
            assert_eq!(aug.row(i).transpose(), augment_state(&row.transpose()));
        }
    }

    #[test]
    fn empty_batch() {
        let aug = augment_batch(&ReducedBatch::zeros(0));
        assert_eq!(aug.nrows(), 0);
        assert_eq!(reduce_batch(&aug).nrows(), 0);
    }

    #[test]
    fn dynamic_rows_match_static_batch() {
        let data = [0.1, 0.2, 1.3, -0.4, -2.0, 0.0, -2.9, 1.0];
        let dynamic = augment_rows(&DMatrix::from_row_slice(2, 4, &data)).unwrap();
        let fixed = augment_batch(&ReducedBatch::from_row_slice(&data));
        assert_eq!(dynamic.shape(), (2, 5));
        for i in 0..2 {
            for j in 0..5 {
                assert_eq!(dynamic[(i, j)], fixed[(i, j)]);
            }
        }

        let reduced = reduce_rows(&dynamic).unwrap();
        assert_eq!(reduced.shape(), (2, 4));
        assert!((reduced[(1, 2)] + 2.9).abs() < 1e-12);
    }

    #[test]
    fn wrong_width_fails_fast() {
        let err = augment_rows(&DMatrix::zeros(3, 5)).unwrap_err();
        assert_eq!(err, CpError::shape("reduced state columns", 4, 5));

        let err = reduce_rows(&DMatrix::zeros(3, 4)).unwrap_err();
        assert_eq!(err, CpError::shape("augmented state columns", 5, 4));

        assert!(augment_slice(&[0.0; 5]).is_err());
        assert!(reduce_slice(&[0.0; 4]).is_err());
    }

    #[test]
    fn slices_match_vectors() {
        let s = [0.0, 1.0, -0.7, 2.0];
        let a = augment_slice(&s).unwrap();
        assert_eq!(a, augment_state(&ReducedState::from_column_slice(&s)));
        assert_eq!(reduce_slice(a.as_slice()).unwrap(), reduce_state(&a));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use core::f64::consts::PI;
    use proptest::prelude::*;

    fn reduced_state() -> impl Strategy<Value = ReducedState> {
        (
            -10.0_f64..10.0,
            -10.0_f64..10.0,
            (-PI + 1e-9)..=PI,
            -20.0_f64..20.0,
        )
            .prop_map(|(x, v, theta, w)| ReducedState::new(x, v, theta, w))
    }

    proptest! {
        #[test]
        fn reduce_inverts_augment(s in reduced_state()) {
            let back = reduce_state(&augment_state(&s));
            for i in 0..REDUCED_STATE_SIZE {
                prop_assert!((back[i] - s[i]).abs() < 1e-12, "component {}: {} vs {}", i, back[i], s[i]);
            }
        }

        #[test]
        fn augmented_angle_is_on_unit_circle(s in reduced_state()) {
            let a = augment_state(&s);
            prop_assert!((a[2] * a[2] + a[3] * a[3] - 1.0).abs() < 1e-12);
        }

        #[test]
        fn batches_match_vectors(rows in prop::collection::vec(reduced_state(), 1..8)) {
            let mut batch = ReducedBatch::zeros(rows.len());
            for (i, s) in rows.iter().enumerate() {
                batch.set_row(i, &s.transpose());
            }
            let aug = augment_batch(&batch);
            let red = reduce_batch(&aug);
            for (i, s) in rows.iter().enumerate() {
                prop_assert_eq!(aug.row(i).transpose(), augment_state(s));
                prop_assert_eq!(red.row(i).transpose(), reduce_state(&augment_state(s)));
            }
        }
    }
}
