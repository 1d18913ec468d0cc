//! Bounded variable least squares solver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::{DMatrix, DVector};

use super::{
    check_start, project, select_columns,
    Backend, BoundedLeastSquares, SolverOptions, SolverSummary, TerminationType
};
use crate::alloc::CostFunction;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Distance outside a bound tolerated before a solution is considered infeasible.
const FEASIBILITY_TOLERANCE: f64 = 1e-10;

/// Singular values below this fraction of the largest are treated as zero.
const RELATIVE_SINGULAR_VALUE_CUTOFF: f64 = 1e-10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Bounded variable least squares for linear residuals `r = A x - b`.
///
/// The jacobian at the starting point is taken as `A`, so the residuals must be linear in the
/// parameters. Variables are split into a free set and a set held on one of their bounds. The free
/// variables are set to the minimum norm least squares solution with the held ones fixed. If that
/// leaves the box, the solver steps along the way to it as far as the bounds allow and holds the
/// variables it ran into. Once the free solution is feasible, the held variable whose multiplier
/// most strongly wants it back inside is released, and the process repeats until no held
/// variable wants to be released.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveSet;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Held {
    Lower,
    Upper,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BoundedLeastSquares for ActiveSet {
    fn minimise(
        &self,
        cost: &dyn CostFunction,
        x: &mut DVector<f64>,
        lower: &DVector<f64>,
        upper: &DVector<f64>,
        options: &SolverOptions
    ) -> SolverSummary {
        project(x, lower, upper);

        let n = x.len();
        let r = cost.residuals(x);
        let initial_cost = 0.5 * r.norm_squared();

        if let Some(summary) = check_start(Backend::ActiveSet, x, lower, upper, &r, initial_cost) {
            return summary
        }

        let a = cost.jacobian(x);
        let b = &a * &*x - r;

        let mut summary = SolverSummary {
            backend: Backend::ActiveSet,
            termination: TerminationType::NoConvergence,
            message: "Maximum number of iterations reached".into(),
            iterations: 0,
            initial_cost,
            final_cost: initial_cost,
        };

        // Variables starting on a bound are held there until their multiplier says otherwise
        let mut held: Vec<Option<Held>> = (0..n)
            .map(|i| {
                if x[i] <= lower[i] {
                    Some(Held::Lower)
                }
                else if x[i] >= upper[i] {
                    Some(Held::Upper)
                }
                else {
                    None
                }
            })
            .collect();

        // Variables released on the last pass, and ones whose release didn't move them inside
        let mut released: Option<(usize, Held)> = None;
        let mut rejected = vec![false; n];

        'outer: loop {

            // ---- FEASIBLE FREE SOLUTION ----

            loop {
                let free: Vec<usize> = (0..n).filter(|&i| held[i].is_none()).collect();

                if free.is_empty() {
                    break;
                }

                if summary.iterations >= options.max_num_iterations {
                    break 'outer;
                }
                summary.iterations += 1;

                // Target for the free variables with the held ones fixed
                let a_free = select_columns(&a, &free);
                let x_free = DVector::from_iterator(free.len(), free.iter().map(|&i| x[i]));
                let rhs = &b - &a * &*x + &a_free * &x_free;

                let z = match min_norm_solve(a_free, &rhs) {
                    Ok(z) if z.iter().all(|v| v.is_finite()) => z,
                    Ok(_) => {
                        summary.termination = TerminationType::Failure;
                        summary.message = "Free subproblem solution is not finite".into();
                        break 'outer;
                    },
                    Err(e) => {
                        summary.termination = TerminationType::Failure;
                        summary.message = format!("Could not solve the free subproblem: {}", e);
                        break 'outer;
                    }
                };

                // A released variable which doesn't move inside is put back
                if let Some((i, side)) = released.take() {
                    if let Some(k) = free.iter().position(|&f| f == i) {
                        let moves_inside = match side {
                            Held::Lower => z[k] > x[i],
                            Held::Upper => z[k] < x[i],
                        };

                        if !moves_inside {
                            held[i] = Some(side);
                            rejected[i] = true;
                            break;
                        }
                    }
                }

                // Largest step towards z which keeps every free variable in the box
                let mut alpha = 1f64;
                for (k, &i) in free.iter().enumerate() {
                    let limit = if z[k] > upper[i] + FEASIBILITY_TOLERANCE {
                        (upper[i] - x[i]) / (z[k] - x[i])
                    }
                    else if z[k] < lower[i] - FEASIBILITY_TOLERANCE {
                        (lower[i] - x[i]) / (z[k] - x[i])
                    }
                    else {
                        continue
                    };

                    alpha = alpha.min(limit.max(0.0));
                }

                for (k, &i) in free.iter().enumerate() {
                    x[i] += alpha * (z[k] - x[i]);
                }
                rejected.iter_mut().for_each(|r| *r = false);

                if alpha >= 1.0 {
                    project(x, lower, upper);
                    break;
                }

                // Hold the variables the step ran into
                for &i in free.iter() {
                    if x[i] <= lower[i] + FEASIBILITY_TOLERANCE {
                        x[i] = lower[i];
                        held[i] = Some(Held::Lower);
                    }
                    else if x[i] >= upper[i] - FEASIBILITY_TOLERANCE {
                        x[i] = upper[i];
                        held[i] = Some(Held::Upper);
                    }
                }

                if options.log_progress {
                    trace!(
                        "{:3}: stepped {:.3} of the way to the free solution, {} held",
                        summary.iterations,
                        alpha,
                        held.iter().filter(|h| h.is_some()).count()
                    );
                }
            }

            // ---- MULTIPLIERS ----

            // Negative gradient of the cost
            let w = a.tr_mul(&(&b - &a * &*x));

            let mut release: Option<(usize, Held)> = None;
            let mut release_w = options.gradient_tolerance;

            for i in 0..n {
                if rejected[i] {
                    continue;
                }

                // Increasing a variable on its lower bound (or decreasing one on its upper)
                // reduces the cost if the multiplier points inside
                let pull = match held[i] {
                    Some(Held::Lower) => w[i],
                    Some(Held::Upper) => -w[i],
                    None => continue,
                };

                if pull > release_w {
                    release_w = pull;
                    release = held[i].map(|side| (i, side));
                }
            }

            match release {
                Some((i, side)) => {
                    if options.log_progress {
                        trace!(
                            "{:3}: releasing variable {} from its {:?} bound, multiplier {:e}",
                            summary.iterations, i, side, release_w
                        );
                    }
                    held[i] = None;
                    released = Some((i, side));
                },
                None => {
                    summary.termination = TerminationType::Convergence;
                    summary.message = "All multipliers of held variables point outside".into();
                    break;
                }
            }
        }

        // Rounding in the step to the boundary can leave a variable just outside its bounds
        project(x, lower, upper);

        summary.final_cost = 0.5 * (&a * &*x - &b).norm_squared();
        summary
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Minimum norm least squares solution of `a z = rhs`.
fn min_norm_solve(a: DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, &'static str> {
    let svd = a.svd(true, true);

    let max_sv = svd.singular_values.iter().cloned().fold(0f64, f64::max);

    svd.solve(rhs, max_sv * RELATIVE_SINGULAR_VALUE_CUTOFF)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::alloc::solver::test::{underdetermined, Linear};

    #[test]
    fn test_min_norm_solve() {
        // Rank one, so the solution must split evenly between the two columns
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]);
        let rhs = DVector::from_row_slice(&[2.0, 4.0]);

        let z = min_norm_solve(a, &rhs).unwrap();

        assert!((z[0] - 1.0).abs() < 1e-12);
        assert!((z[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unbounded_gives_minimum_norm() {
        let cost = underdetermined();
        let lower = DVector::from_element(3, -100.0);
        let upper = DVector::from_element(3, 100.0);

        let mut x = DVector::zeros(3);
        let summary = ActiveSet.minimise(&cost, &mut x, &lower, &upper, &SolverOptions::default());

        assert!(summary.converged(), "{}", summary.report());
        assert_eq!(summary.iterations, 1);

        let a = &cost.a;
        let expected = a.transpose()
            * (a * a.transpose()).try_inverse().unwrap()
            * &cost.b;
        assert!((&x - expected).norm() < 1e-10, "{}", x);
    }

    #[test]
    fn test_saturates_and_holds() {
        // Both unknowns want to be 3, but can only reach 1
        let cost = Linear {
            a: DMatrix::identity(2, 2),
            b: DVector::from_row_slice(&[3.0, -0.5]),
        };

        let mut x = DVector::zeros(2);
        let summary = ActiveSet.minimise(
            &cost,
            &mut x,
            &DVector::from_element(2, -1.0),
            &DVector::from_element(2, 1.0),
            &SolverOptions::default()
        );

        assert!(summary.converged(), "{}", summary.report());
        assert_eq!(x[0], 1.0);
        assert!((x[1] + 0.5).abs() < 1e-12);
        assert!((summary.final_cost - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_releases_bound_with_inward_multiplier() {
        // Start on the upper bound of the first variable while the optimum is inside
        let cost = Linear {
            a: DMatrix::identity(2, 2),
            b: DVector::from_row_slice(&[0.25, 0.5]),
        };

        let mut x = DVector::from_row_slice(&[1.0, 0.0]);
        let summary = ActiveSet.minimise(
            &cost,
            &mut x,
            &DVector::from_element(2, -1.0),
            &DVector::from_element(2, 1.0),
            &SolverOptions::default()
        );

        assert!(summary.converged(), "{}", summary.report());
        assert!((x[0] - 0.25).abs() < 1e-12);
        assert!((x[1] - 0.5).abs() < 1e-12);
        assert!(summary.final_cost < 1e-20);
    }
}
