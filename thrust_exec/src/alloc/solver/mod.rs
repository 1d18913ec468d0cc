//! # Bounded Least Squares Solvers
//!
//! Minimise `0.5 * |r(x)|^2` subject to `lower <= x <= upper`. Two backends are provided:
//!
//! - [`TrustRegion`]: a projected Levenberg-Marquardt method, usable with any [`CostFunction`].
//! - [`ActiveSet`]: a bounded variable least squares method for residuals which are linear in the
//!   parameters, working from minimum norm solutions of the free variables.
//!
//! Both start from the supplied `x`, which is projected into the bounds first, and both report
//! their outcome in a [`SolverSummary`] rather than as an error. A solve which runs out of
//! iterations still leaves its best estimate in `x`.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod active_set;
mod trust_region;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::CostFunction;

pub use active_set::ActiveSet;
pub use trust_region::TrustRegion;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Distance from a bound within which a variable is considered to be on it.
pub const BOUND_TOLERANCE: f64 = 1e-12;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait BoundedLeastSquares {
    /// Minimise `cost` over `x` within `[lower, upper]`, leaving the solution in `x`.
    fn minimise(
        &self,
        cost: &dyn CostFunction,
        x: &mut DVector<f64>,
        lower: &DVector<f64>,
        upper: &DVector<f64>,
        options: &SolverOptions
    ) -> SolverSummary;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Options shared by the solver backends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SolverOptions {
    /// Maximum number of iterations before giving up
    pub max_num_iterations: usize,

    /// Stop when `|cost change| <= function_tolerance * cost`
    pub function_tolerance: f64,

    /// Stop when the largest component of the projected gradient is at most this
    pub gradient_tolerance: f64,

    /// Stop when `|step| <= parameter_tolerance * (|x| + parameter_tolerance)`
    pub parameter_tolerance: f64,

    /// Starting trust region radius. The Levenberg-Marquardt damping starts at its reciprocal.
    pub initial_trust_region_radius: f64,

    /// Log the progress of every iteration at trace level
    pub log_progress: bool,
}

/// Outcome of a solve.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SolverSummary {
    pub backend: Backend,

    pub termination: TerminationType,

    /// Human readable reason for termination
    pub message: String,

    /// Number of iterations performed
    pub iterations: usize,

    /// Cost at the (projected) starting point
    pub initial_cost: f64,

    /// Cost at the returned point
    pub final_cost: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The available solver backends.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    TrustRegion,
    ActiveSet,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationType {
    /// One of the convergence tolerances was met
    Convergence,

    /// The iteration limit was reached first
    NoConvergence,

    /// The solver could not continue, for example due to a failed factorisation
    Failure,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_num_iterations: 100,
            function_tolerance: 1e-6,
            gradient_tolerance: 1e-10,
            parameter_tolerance: 1e-8,
            initial_trust_region_radius: 1e4,
            log_progress: false,
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Backend::TrustRegion
    }
}

impl BoundedLeastSquares for Backend {
    fn minimise(
        &self,
        cost: &dyn CostFunction,
        x: &mut DVector<f64>,
        lower: &DVector<f64>,
        upper: &DVector<f64>,
        options: &SolverOptions
    ) -> SolverSummary {
        match self {
            Backend::TrustRegion => TrustRegion.minimise(cost, x, lower, upper, options),
            Backend::ActiveSet => ActiveSet.minimise(cost, x, lower, upper, options),
        }
    }
}

impl SolverSummary {
    pub fn converged(&self) -> bool {
        self.termination == TerminationType::Convergence
    }

    /// Multi-line report of the solve.
    pub fn report(&self) -> String {
        format!(
            "Solver summary\n    \
            backend:      {:?}\n    \
            termination:  {:?} ({})\n    \
            iterations:   {}\n    \
            initial cost: {:e}\n    \
            final cost:   {:e}\n    \
            change:       {:e}",
            self.backend,
            self.termination,
            self.message,
            self.iterations,
            self.initial_cost,
            self.final_cost,
            self.initial_cost - self.final_cost
        )
    }
}

impl fmt::Display for TerminationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationType::Convergence => "CONVERGENCE",
            TerminationType::NoConvergence => "NO_CONVERGENCE",
            TerminationType::Failure => "FAILURE",
        };

        f.write_str(s)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Clamp every component of `x` into its bounds.
fn project(x: &mut DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) {
    for i in 0..x.len() {
        x[i] = util::maths::clamp(&x[i], &lower[i], &upper[i]);
    }
}

/// Check that a solve can start from `x`.
///
/// A start with a non-finite parameter, residual or cost can't be improved on, so a `Failure`
/// summary is returned for it. Non-finite parameters are replaced by zero projected into their
/// bounds, so that `x` is always usable afterwards.
fn check_start(
    backend: Backend,
    x: &mut DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    r: &DVector<f64>,
    cost: f64
) -> Option<SolverSummary> {
    let x_finite = x.iter().all(|v| v.is_finite());

    if x_finite && r.iter().all(|v| v.is_finite()) && cost.is_finite() {
        return None
    }

    for i in 0..x.len() {
        if !x[i].is_finite() {
            x[i] = util::maths::clamp(&0.0, &lower[i], &upper[i]);
        }
    }

    Some(SolverSummary {
        backend,
        termination: TerminationType::Failure,
        message: format!(
            "Cannot start from a non-finite {} (cost {:e})",
            if x_finite { "residual" } else { "parameter" },
            cost
        ),
        iterations: 0,
        initial_cost: cost,
        final_cost: cost,
    })
}

/// The columns of `m` given by `cols`, in that order.
fn select_columns(m: &DMatrix<f64>, cols: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), cols.len(), |r, c| m[(r, cols[c])])
}

#[cfg(test)]
mod test {
    use super::*;

    /// `r(x) = A x - b` for a fixed matrix
    pub(super) struct Linear {
        pub a: DMatrix<f64>,
        pub b: DVector<f64>,
    }

    impl CostFunction for Linear {
        fn num_residuals(&self) -> usize {
            self.a.nrows()
        }

        fn num_parameters(&self) -> usize {
            self.a.ncols()
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            &self.a * x - &self.b
        }

        fn jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
            self.a.clone()
        }
    }

    /// Two equations in three unknowns, the second unknown is only weakly observed.
    pub(super) fn underdetermined() -> Linear {
        Linear {
            a: DMatrix::from_row_slice(2, 3, &[
                1.0, 1.0, 0.0,
                0.0, 0.5, 1.0,
            ]),
            b: DVector::from_row_slice(&[2.0, 1.0]),
        }
    }

    #[test]
    fn test_backends_agree_on_bounded_problem() {
        let cost = underdetermined();
        let lower = DVector::from_element(3, -0.5);
        let upper = DVector::from_element(3, 0.9);
        let options = SolverOptions::default();

        let mut x_tr = DVector::zeros(3);
        let tr = Backend::TrustRegion.minimise(&cost, &mut x_tr, &lower, &upper, &options);

        let mut x_as = DVector::zeros(3);
        let as_ = Backend::ActiveSet.minimise(&cost, &mut x_as, &lower, &upper, &options);

        assert!(tr.converged(), "{}", tr.report());
        assert!(as_.converged(), "{}", as_.report());
        assert!((tr.final_cost - as_.final_cost).abs() < 1e-8);

        for i in 0..3 {
            assert!(x_tr[i] >= -0.5 && x_tr[i] <= 0.9);
            assert!(x_as[i] >= -0.5 && x_as[i] <= 0.9);
        }
    }

    #[test]
    fn test_select_columns() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let s = select_columns(&m, &[2, 0]);

        assert_eq!(s, DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 6.0, 4.0]));
    }

    #[test]
    fn test_non_finite_start_fails_on_both_backends() {
        let lower = DVector::from_element(3, -0.5);
        let upper = DVector::from_element(3, 0.9);

        for &backend in [Backend::TrustRegion, Backend::ActiveSet].iter() {
            // Residual which overflows when squared
            let mut huge = underdetermined();
            huge.b[0] = 1e300;

            let mut x = DVector::zeros(3);
            let summary = backend.minimise(
                &huge, &mut x, &lower, &upper, &SolverOptions::default()
            );

            assert_eq!(summary.termination, TerminationType::Failure, "{}", summary.report());
            assert_eq!(summary.iterations, 0);
            assert_eq!(x, DVector::zeros(3));

            // Non-finite starting point
            let mut x = DVector::from_row_slice(&[std::f64::NAN, 0.5, std::f64::NAN]);
            let summary = backend.minimise(
                &underdetermined(), &mut x, &lower, &upper, &SolverOptions::default()
            );

            assert_eq!(summary.termination, TerminationType::Failure, "{}", summary.report());
            assert_eq!(x, DVector::from_row_slice(&[0.0, 0.5, 0.0]));
        }
    }

    #[test]
    fn test_report_contains_termination() {
        let summary = SolverSummary {
            backend: Backend::ActiveSet,
            termination: TerminationType::NoConvergence,
            message: "Maximum number of iterations reached".into(),
            iterations: 100,
            initial_cost: 0.5,
            final_cost: 0.25,
        };

        assert!(!summary.converged());
        assert!(summary.report().contains("NoConvergence"));
        assert_eq!(TerminationType::Failure.to_string(), "FAILURE");
    }
}
