//! The thrust allocation problem

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::{accel::AccelCmd, thrust::ThrustForces};
use log::debug;
use nalgebra::DVector;

// Internal
use super::{
    solver::{Backend, BoundedLeastSquares, SolverOptions, SolverSummary},
    AllocError, BalanceEquation, BalanceEquations
};
use crate::{geometry::GeometryModel, vehicle::VehicleModel};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Bound constrained least squares allocation of a body acceleration onto the thrusters.
///
/// Built once from the geometry and vehicle models, then solved for each command. Every solve
/// starts from zero force on all thrusters and nothing is carried between solves.
///
/// With ten thrusters and six equations the problem is over actuated. No secondary objective is
/// applied to choose between the exact solutions; the solvers are drawn towards the one with the
/// smallest total force, subject to the bounds.
#[derive(Debug, Clone)]
pub struct AllocationProblem {
    equations: BalanceEquations,

    /// Thrust bounds as `(min, max)`
    bounds_n: (f64, f64),

    lower: DVector<f64>,
    upper: DVector<f64>,

    backend: Backend,
    options: SolverOptions,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AllocationProblem {
    pub fn new(
        geometry: &GeometryModel,
        vehicle: &VehicleModel,
        backend: Backend,
        options: SolverOptions
    ) -> Result<Self, AllocError> {
        let equations = BalanceEquations::new(geometry, vehicle)?;

        for &id in equations.ids().iter() {
            let row: Vec<f64> = BalanceEquation::ALL
                .iter()
                .map(|&eq| equations.coefficient(eq, id))
                .collect();
            debug!("{:>16} coefficients (surge..yaw): {:.4?}", id, row);
        }

        let n = equations.ids().len();
        let (min, max) = vehicle.thrust_bounds_n();

        Ok(Self {
            equations,
            bounds_n: (min, max),
            lower: DVector::from_element(n, min),
            upper: DVector::from_element(n, max),
            backend,
            options
        })
    }

    /// Compute the thruster forces for the given command.
    ///
    /// The forces are returned whether or not the solver converged, check the summary.
    pub fn solve(&self, cmd: &AccelCmd) -> (ThrustForces, SolverSummary) {
        let cost = self.equations.for_command(cmd);

        let mut x = DVector::zeros(self.equations.ids().len());

        debug!("Initial forces: {:?}", self.equations.to_forces(&x));

        let summary = self.backend.minimise(&cost, &mut x, &self.lower, &self.upper, &self.options);

        let forces = self.equations.to_forces(&x);

        debug!("Final forces: {:?}", forces);
        debug!("{}", summary.report());

        (forces, summary)
    }

    pub fn equations(&self) -> &BalanceEquations {
        &self.equations
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Thrust bounds applied to every thruster, as `(min, max)`.
    pub fn thrust_bounds_n(&self) -> (f64, f64) {
        self.bounds_n
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::thrust::{ThrustAxis, ThrusterId};
    use crate::{
        alloc::solver::TerminationType,
        geometry::{GeometryParams, StaticPoseSource, ThrusterPosition},
        params::AllocParams
    };

    const BACKENDS: [Backend; 2] = [Backend::TrustRegion, Backend::ActiveSet];

    fn reference_models() -> (GeometryModel, VehicleModel) {
        let geom_params: GeometryParams = util::params::parse(
            include_str!("../../../params/thruster_geometry.toml")
        ).unwrap();
        let alloc_params: AllocParams = util::params::parse(
            include_str!("../../../params/thrust_alloc.toml")
        ).unwrap();

        let geometry = GeometryModel::resolve(
            &mut StaticPoseSource::from_params(&geom_params).unwrap(),
            &geom_params
        ).unwrap();

        (geometry, VehicleModel::new(alloc_params.vehicle).unwrap())
    }

    fn reference_problem(backend: Backend) -> AllocationProblem {
        let (geometry, vehicle) = reference_models();
        AllocationProblem::new(&geometry, &vehicle, backend, SolverOptions::default()).unwrap()
    }

    /// A spread of commands, some well inside and some well outside what the thrusters can do.
    fn commands() -> Vec<AccelCmd> {
        vec![
            AccelCmd::new([0.1, 0.0, 0.0], [0.0, 0.0, 0.0]),
            AccelCmd::new([0.0, -0.2, 0.05], [0.0, 0.0, 0.3]),
            AccelCmd::new([0.05, 0.05, -0.1], [0.2, -0.1, 0.05]),
            AccelCmd::new([-3.0, 2.0, 1.5], [4.0, -2.5, 3.0]),
            AccelCmd::new([100.0, -100.0, 100.0], [-50.0, 50.0, -50.0]),
        ]
    }

    #[test]
    fn test_zero_command() {
        for &backend in BACKENDS.iter() {
            let problem = reference_problem(backend);
            let (forces, summary) = problem.solve(&AccelCmd::default());

            assert!(summary.converged(), "{}", summary.report());
            for (id, f) in forces.iter() {
                assert!(f.abs() < 1e-6, "{:?} {} = {}", backend, id, f);
            }
        }
    }

    #[test]
    fn test_forces_within_bounds() {
        for &backend in BACKENDS.iter() {
            let problem = reference_problem(backend);
            assert_eq!(problem.thrust_bounds_n(), (-18.0, 18.0));

            for cmd in commands().iter() {
                let (forces, _) = problem.solve(cmd);

                for (id, f) in forces.iter() {
                    assert!(
                        f >= -18.0 && f <= 18.0,
                        "{:?} {} = {} for {:?}", backend, id, f, cmd
                    );
                }
            }
        }
    }

    #[test]
    fn test_large_surge_saturates() {
        for &backend in BACKENDS.iter() {
            let problem = reference_problem(backend);
            let (forces, summary) = problem.solve(&AccelCmd::new([100.0, 0.0, 0.0], [0.0; 3]));

            assert_ne!(summary.termination, TerminationType::Failure);

            for (id, f) in forces.iter() {
                match id.axis() {
                    ThrustAxis::Surge => assert!((f - 18.0).abs() < 1e-6, "{} = {}", id, f),
                    _ => assert!(f.abs() < 1e-6, "{} = {}", id, f),
                }
            }
        }
    }

    #[test]
    fn test_non_finite_or_overflowing_command_fails_safe() {
        let extremes = [
            std::f64::INFINITY,
            std::f64::NEG_INFINITY,
            std::f64::NAN,
            1e300,
        ];

        for &backend in BACKENDS.iter() {
            let problem = reference_problem(backend);

            for &surge in extremes.iter() {
                let (forces, summary) = problem.solve(&AccelCmd::new([surge, 0.0, 0.0], [0.0; 3]));

                assert_eq!(
                    summary.termination, TerminationType::Failure,
                    "{:?} surge {}: {}", backend, surge, summary.report()
                );

                for (id, f) in forces.iter() {
                    assert!(
                        f.is_finite() && f >= -18.0 && f <= 18.0,
                        "{:?} surge {}: {} = {}", backend, surge, id, f
                    );
                }
            }
        }
    }

    #[test]
    fn test_unit_surge_splits_evenly() {
        let quarter_mass = 48.8428 / 4.0;

        for &backend in BACKENDS.iter() {
            let problem = reference_problem(backend);
            let (forces, summary) = problem.solve(&AccelCmd::new([1.0, 0.0, 0.0], [0.0; 3]));

            assert!(summary.converged(), "{}", summary.report());

            for (id, f) in forces.iter() {
                match id.axis() {
                    ThrustAxis::Surge => {
                        assert!((f - quarter_mass).abs() < 1e-6, "{:?} {} = {}", backend, id, f)
                    },
                    _ => assert!(f.abs() < 1e-6, "{:?} {} = {}", backend, id, f),
                }
            }
        }
    }

    #[test]
    fn test_repeated_solves_identical() {
        for &backend in BACKENDS.iter() {
            let problem = reference_problem(backend);

            for cmd in commands().iter() {
                let (first, first_summary) = problem.solve(cmd);
                let (second, second_summary) = problem.solve(cmd);

                assert_eq!(first, second);
                assert_eq!(first_summary, second_summary);
            }
        }
    }

    #[test]
    fn test_unsaturated_solutions_balance() {
        for &backend in BACKENDS.iter() {
            let problem = reference_problem(backend);

            // Only the commands the thrusters can achieve
            for cmd in commands()[0..3].iter() {
                let (forces, summary) = problem.solve(cmd);

                assert!(summary.converged(), "{}", summary.report());
                assert!(forces.iter().all(|(_, f)| f.abs() < 18.0 - 1e-6));

                let r = problem.equations().residuals(&forces, cmd);
                assert!(r.iter().all(|v| v.abs() < 1e-6), "{:?} {:?}", backend, r);
            }
        }
    }

    #[test]
    fn test_relabelling_thrusters_only_moves_values() {
        let (geometry, vehicle) = reference_models();

        // Same positions, enumerated in a scrambled order
        let order = [7, 2, 9, 0, 5, 3, 8, 1, 6, 4];
        let scrambled: Vec<ThrusterPosition> = order
            .iter()
            .map(|&i| geometry.positions()[i])
            .collect();
        let scrambled = GeometryModel::from_positions(scrambled).unwrap();

        for &backend in BACKENDS.iter() {
            let problem = AllocationProblem::new(
                &geometry, &vehicle, backend, SolverOptions::default()
            ).unwrap();
            let scrambled_problem = AllocationProblem::new(
                &scrambled, &vehicle, backend, SolverOptions::default()
            ).unwrap();

            assert_ne!(problem.equations().ids(), scrambled_problem.equations().ids());

            // Commands whose solution doesn't depend on the path the solver takes
            let mut unique = commands()[0..3].to_vec();
            unique.push(AccelCmd::new([100.0, 0.0, 0.0], [0.0; 3]));

            for cmd in unique.iter() {
                let (forces, _) = problem.solve(cmd);
                let (scrambled_forces, _) = scrambled_problem.solve(cmd);

                for &id in ThrusterId::ALL.iter() {
                    assert!(
                        (forces.get(id) - scrambled_forces.get(id)).abs() < 1e-6,
                        "{:?} {}: {} != {}",
                        backend, id, forces.get(id), scrambled_forces.get(id)
                    );
                }
            }
        }
    }
}
