use ode_solvers::System;

use crate::structs::compartments::{Compartments, State};
use crate::structs::parameters::Parameters;

/// Right-hand side of the SEIR-V system
///
/// Humans follow an SEIR progression driven by the fraction of infectious mosquitoes,
/// mosquitoes follow an SI progression driven by the fraction of infectious humans.
/// Mosquito births equal deaths (`mu_v`), and every newborn mosquito is susceptible.
///
/// `_t` is unused; the system is autonomous.
#[inline(always)]
pub fn derivative(_t: f64, y: &Compartments, p: &Parameters) -> Compartments {
    // Humans
    let lambda_h = p.force_of_infection_human(y.iv);
    let infections_h = lambda_h * y.s;
    let onset = p.epsilon() * y.e;
    let recoveries = p.gamma() * y.i;

    // Mosquitoes
    let nv = y.sv + y.iv;
    let lambda_v = p.force_of_infection_vector(y.i);
    let infections_v = lambda_v * y.sv;

    Compartments {
        s: -infections_h,
        e: infections_h - onset,
        i: onset - recoveries,
        r: recoveries,
        sv: p.mu_v() * nv - infections_v - p.mu_v() * y.sv,
        iv: infections_v - p.mu_v() * y.iv,
    }
}

/// The SEIR-V model as seen by the ODE solver
#[derive(Debug, Clone, Copy)]
pub struct Seirv {
    params: Parameters,
}

impl Seirv {
    pub fn new(params: Parameters) -> Self {
        Seirv { params }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Evaluate the derivative on a solver state vector
    #[inline(always)]
    pub fn rhs(&self, t: f64, y: &State) -> State {
        derivative(t, &Compartments::from(y), &self.params).into()
    }
}

impl System<f64, State> for Seirv {
    fn system(&self, t: f64, y: &State, dy: &mut State) {
        *dy = self.rhs(t, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> Parameters {
        Parameters::new(0.35, 0.15, 1.0 / 7.0, 1.0 / 5.0, 1.0 / 14.0, 100_000).unwrap()
    }

    #[test]
    fn test_derivative_at_outbreak_start() {
        let y = Compartments::from_array([99_990.0, 0.0, 10.0, 0.0, 200_000.0, 500.0]);
        let dy = derivative(0.0, &y, &params());

        let lambda_h = 0.35 * 500.0 / 100_000.0;
        assert_relative_eq!(dy.s, -lambda_h * 99_990.0, max_relative = 1e-12);
        assert_relative_eq!(dy.e, lambda_h * 99_990.0, max_relative = 1e-12);
        assert_relative_eq!(dy.i, -10.0 / 7.0, max_relative = 1e-12);
        assert_relative_eq!(dy.r, 10.0 / 7.0, max_relative = 1e-12);

        let lambda_v = 0.15 * 10.0 / 100_000.0;
        assert_relative_eq!(dy.iv, lambda_v * 200_000.0 - 500.0 / 14.0, max_relative = 1e-12);
    }

    #[test]
    fn test_populations_are_conserved_by_the_rhs() {
        let y = Compartments::from_array([5_000.0, 1_200.0, 800.0, 3_000.0, 40_000.0, 2_500.0]);
        let dy = derivative(3.5, &y, &params());
        assert_relative_eq!(dy.humans(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(dy.vectors(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_disease_free_state_is_stationary() {
        let y = Compartments::from_array([100_000.0, 0.0, 0.0, 0.0, 200_000.0, 0.0]);
        let dy = derivative(0.0, &y, &params());
        assert_eq!(dy.to_array(), [0.0; 6]);
    }

    #[test]
    fn test_system_matches_derivative() {
        let model = Seirv::new(params());
        let c = Compartments::from_array([99_990.0, 0.0, 10.0, 0.0, 200_000.0, 500.0]);
        let mut dy = State::zeros();
        model.system(0.0, &c.into(), &mut dy);
        assert_eq!(Compartments::from(&dy), derivative(0.0, &c, &params()));
    }
}
