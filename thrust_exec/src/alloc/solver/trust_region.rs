//! Projected Levenberg-Marquardt solver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::{DMatrix, DVector};

use super::{
    check_start, project, select_columns,
    Backend, BoundedLeastSquares, SolverOptions, SolverSummary, TerminationType,
    BOUND_TOLERANCE
};
use crate::alloc::CostFunction;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Minimum ratio of actual to predicted cost reduction for a step to be accepted.
const MIN_RELATIVE_DECREASE: f64 = 1e-3;

/// Damping above which the trust region is considered to have collapsed.
const MAX_DAMPING: f64 = 1e32;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Projected Levenberg-Marquardt.
///
/// Each iteration holds the variables which sit on a bound with the gradient pushing them further
/// out, solves the damped normal equations `(J'J + mu I) dx = -J'r` over the rest, and projects
/// the step back into the box. Steps are accepted on the ratio of actual to predicted cost
/// reduction, which also drives the damping. The damping is isotropic so that, from a zero start,
/// a linear problem is drawn towards its minimum norm solution.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustRegion;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BoundedLeastSquares for TrustRegion {
    fn minimise(
        &self,
        cost: &dyn CostFunction,
        x: &mut DVector<f64>,
        lower: &DVector<f64>,
        upper: &DVector<f64>,
        options: &SolverOptions
    ) -> SolverSummary {
        project(x, lower, upper);

        let mut r = cost.residuals(x);
        let mut current_cost = 0.5 * r.norm_squared();

        let start = check_start(Backend::TrustRegion, x, lower, upper, &r, current_cost);
        if let Some(summary) = start {
            return summary
        }

        let mut jac = cost.jacobian(x);

        let mut summary = SolverSummary {
            backend: Backend::TrustRegion,
            termination: TerminationType::NoConvergence,
            message: "Maximum number of iterations reached".into(),
            iterations: 0,
            initial_cost: current_cost,
            final_cost: current_cost,
        };

        let mut mu = 1.0 / options.initial_trust_region_radius;
        let mut nu = 2.0;

        while summary.iterations < options.max_num_iterations {
            let gradient = jac.tr_mul(&r);

            // Gradient tolerance, on the projected gradient so that a solution pinned on its
            // bounds can still converge
            let mut projected_gradient_max = 0f64;
            for i in 0..x.len() {
                let stepped = util::maths::clamp(&(x[i] - gradient[i]), &lower[i], &upper[i]);
                projected_gradient_max = projected_gradient_max.max((x[i] - stepped).abs());
            }

            if projected_gradient_max <= options.gradient_tolerance {
                summary.termination = TerminationType::Convergence;
                summary.message = format!(
                    "Gradient tolerance reached, max projected gradient {:e} <= {:e}",
                    projected_gradient_max, options.gradient_tolerance
                );
                break;
            }

            summary.iterations += 1;

            // Hold variables which the gradient would push through their bound
            let free: Vec<usize> = (0..x.len())
                .filter(|&i| {
                    let on_lower = x[i] - lower[i] <= BOUND_TOLERANCE;
                    let on_upper = upper[i] - x[i] <= BOUND_TOLERANCE;

                    !(on_lower && gradient[i] > 0.0) && !(on_upper && gradient[i] < 0.0)
                })
                .collect();

            let jac_free = select_columns(&jac, &free);
            let hessian = jac_free.tr_mul(&jac_free)
                + DMatrix::identity(free.len(), free.len()) * mu;
            let rhs = -jac_free.tr_mul(&r);

            let dx_free = match hessian.cholesky() {
                Some(c) => c.solve(&rhs),
                None => {
                    summary.termination = TerminationType::Failure;
                    summary.message = format!(
                        "Could not factorise the damped normal equations (mu = {:e})", mu
                    );
                    break;
                }
            };

            let mut x_new = x.clone();
            for (k, &i) in free.iter().enumerate() {
                x_new[i] += dx_free[k];
            }
            project(&mut x_new, lower, upper);

            let step = &x_new - &*x;
            let step_norm = step.norm();

            // Parameter tolerance
            if step_norm <= options.parameter_tolerance * (x.norm() + options.parameter_tolerance) {
                summary.termination = TerminationType::Convergence;
                summary.message = format!(
                    "Parameter tolerance reached, step {:e} <= {:e}",
                    step_norm,
                    options.parameter_tolerance * (x.norm() + options.parameter_tolerance)
                );
                break;
            }

            let r_new = cost.residuals(&x_new);
            let new_cost = 0.5 * r_new.norm_squared();

            // x is left at the last finite point
            if !new_cost.is_finite() {
                summary.termination = TerminationType::Failure;
                summary.message = format!("Cost became non-finite ({:e}) after a step", new_cost);
                break;
            }

            // Predicted reduction from the linearised model of the projected step
            let model_cost = 0.5 * (&r + &jac * &step).norm_squared();
            let predicted = current_cost - model_cost;
            let actual = current_cost - new_cost;

            let rho = if predicted > 0.0 {
                actual / predicted
            }
            else {
                -1.0
            };

            if options.log_progress {
                trace!(
                    "{:3}: cost {:e}, cost change {:e}, |step| {:e}, rho {:.3}, mu {:e}, free {}",
                    summary.iterations, current_cost, actual, step_norm, rho, mu, free.len()
                );
            }

            if rho > MIN_RELATIVE_DECREASE {
                *x = x_new;
                r = r_new;
                jac = cost.jacobian(x);

                let previous_cost = current_cost;
                current_cost = new_cost;

                mu *= (1.0f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
                nu = 2.0;

                // Function tolerance
                if actual.abs() <= options.function_tolerance * previous_cost {
                    summary.termination = TerminationType::Convergence;
                    summary.message = format!(
                        "Function tolerance reached, |cost change| {:e} <= {:e}",
                        actual.abs(), options.function_tolerance * previous_cost
                    );
                    break;
                }
            }
            else {
                mu *= nu;
                nu *= 2.0;

                if mu > MAX_DAMPING {
                    summary.termination = TerminationType::Convergence;
                    summary.message = "Minimum trust region radius reached".into();
                    break;
                }
            }
        }

        summary.final_cost = current_cost;
        summary
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::alloc::solver::test::{underdetermined, Linear};

    #[test]
    fn test_unbounded_gives_minimum_norm() {
        let cost = underdetermined();
        let lower = DVector::from_element(3, -100.0);
        let upper = DVector::from_element(3, 100.0);

        let mut x = DVector::zeros(3);
        let summary = TrustRegion.minimise(&cost, &mut x, &lower, &upper, &SolverOptions::default());

        assert!(summary.converged(), "{}", summary.report());
        assert!(summary.final_cost < 1e-16);

        // Minimum norm solution of the system is A' (A A')^-1 b
        let a = &cost.a;
        let expected = a.transpose()
            * (a * a.transpose()).try_inverse().unwrap()
            * &cost.b;
        assert!((&x - expected).norm() < 1e-6, "{}", x);
    }

    #[test]
    fn test_zero_residual_converges_immediately() {
        let cost = Linear {
            a: DMatrix::identity(2, 2),
            b: DVector::zeros(2),
        };
        let bound = DVector::from_element(2, 1.0);

        let mut x = DVector::zeros(2);
        let summary = TrustRegion.minimise(&cost, &mut x, &-&bound, &bound, &SolverOptions::default());

        assert!(summary.converged());
        assert_eq!(summary.iterations, 0);
        assert_eq!(x, DVector::zeros(2));
    }

    #[test]
    fn test_iteration_cap() {
        let cost = underdetermined();
        let lower = DVector::from_element(3, -100.0);
        let upper = DVector::from_element(3, 100.0);
        let options = SolverOptions {
            max_num_iterations: 1,
            initial_trust_region_radius: 1e-4,
            ..Default::default()
        };

        let mut x = DVector::zeros(3);
        let summary = TrustRegion.minimise(&cost, &mut x, &lower, &upper, &options);

        assert_eq!(summary.termination, TerminationType::NoConvergence);
        assert_eq!(summary.iterations, 1);
        assert!(summary.final_cost < summary.initial_cost);
    }

    /// `r(x) = x - 5`, which can't be evaluated past 1
    struct Cliff;

    impl CostFunction for Cliff {
        fn num_residuals(&self) -> usize {
            1
        }

        fn num_parameters(&self) -> usize {
            1
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            if x[0] < 1.0 {
                DVector::from_element(1, x[0] - 5.0)
            }
            else {
                DVector::from_element(1, std::f64::NAN)
            }
        }

        fn jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::identity(1, 1)
        }
    }

    #[test]
    fn test_non_finite_cost_after_step_fails() {
        let mut x = DVector::zeros(1);
        let summary = TrustRegion.minimise(
            &Cliff,
            &mut x,
            &DVector::from_element(1, -10.0),
            &DVector::from_element(1, 10.0),
            &SolverOptions::default()
        );

        assert_eq!(summary.termination, TerminationType::Failure, "{}", summary.report());
        assert_eq!(summary.iterations, 1);
        assert_eq!(x[0], 0.0);
        assert_eq!(summary.final_cost, 12.5);
    }

    #[test]
    fn test_start_projected_into_bounds() {
        let cost = Linear {
            a: DMatrix::identity(1, 1),
            b: DVector::from_element(1, 5.0),
        };

        let mut x = DVector::from_element(1, -3.0);
        let summary = TrustRegion.minimise(
            &cost,
            &mut x,
            &DVector::from_element(1, 0.0),
            &DVector::from_element(1, 2.0),
            &SolverOptions::default()
        );

        assert!(summary.converged(), "{}", summary.report());
        assert_eq!(summary.initial_cost, 12.5);
        assert!((x[0] - 2.0).abs() < 1e-12);
    }
}
