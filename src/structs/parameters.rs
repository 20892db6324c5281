use serde_derive::{Deserialize, Serialize};

use crate::error::{ensure_finite, SimulationError};

/// Epidemiological parameters of the SEIR-V model
///
/// The record is validated on construction and immutable afterwards. Rates are
/// per unit of time (days in the bundled scenarios).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Parameters {
    beta_h: f64,
    beta_v: f64,
    gamma: f64,
    epsilon: f64,
    mu_v: f64,
    n_h: u64,
}

impl Parameters {
    /// Create a new, validated parameter record
    ///
    /// - `beta_h`: mosquito to human transmission rate, `>= 0`
    /// - `beta_v`: human to mosquito transmission rate, `>= 0`
    /// - `gamma`: human recovery rate, `> 0`
    /// - `epsilon`: human incubation rate (E to I), `> 0`
    /// - `mu_v`: mosquito birth and death rate, `> 0`
    /// - `n_h`: total human population, `> 0`
    pub fn new(
        beta_h: f64,
        beta_v: f64,
        gamma: f64,
        epsilon: f64,
        mu_v: f64,
        n_h: u64,
    ) -> Result<Self, SimulationError> {
        Ok(Parameters {
            beta_h: non_negative("beta_h", beta_h)?,
            beta_v: non_negative("beta_v", beta_v)?,
            gamma: positive("gamma", gamma)?,
            epsilon: positive("epsilon", epsilon)?,
            mu_v: positive("mu_v", mu_v)?,
            n_h: population(n_h)?,
        })
    }

    pub fn beta_h(&self) -> f64 {
        self.beta_h
    }

    pub fn beta_v(&self) -> f64 {
        self.beta_v
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn mu_v(&self) -> f64 {
        self.mu_v
    }

    pub fn n_h(&self) -> u64 {
        self.n_h
    }

    /// Force of infection acting on susceptible humans, given the number of infectious mosquitoes
    #[inline(always)]
    pub fn force_of_infection_human(&self, iv: f64) -> f64 {
        self.beta_h * iv / self.n_h as f64
    }

    /// Force of infection acting on susceptible mosquitoes, given the number of infectious humans
    #[inline(always)]
    pub fn force_of_infection_vector(&self, i: f64) -> f64 {
        self.beta_v * i / self.n_h as f64
    }
}

/// Raw parameter values as they appear in a settings file
///
/// Converted into [Parameters] through [TryFrom], which applies the same validation as [Parameters::new].
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct ParameterSettings {
    pub beta_h: f64,
    pub beta_v: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub mu_v: f64,
    pub n_h: i64,
}

impl TryFrom<ParameterSettings> for Parameters {
    type Error = SimulationError;

    fn try_from(raw: ParameterSettings) -> Result<Self, Self::Error> {
        let n_h = u64::try_from(raw.n_h).map_err(|_| {
            SimulationError::invalid("n_h", format!("must be positive (got {})", raw.n_h))
        })?;
        Parameters::new(raw.beta_h, raw.beta_v, raw.gamma, raw.epsilon, raw.mu_v, n_h)
    }
}

impl From<Parameters> for ParameterSettings {
    fn from(p: Parameters) -> Self {
        ParameterSettings {
            beta_h: p.beta_h,
            beta_v: p.beta_v,
            gamma: p.gamma,
            epsilon: p.epsilon,
            mu_v: p.mu_v,
            n_h: p.n_h as i64,
        }
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<f64, SimulationError> {
    let value = ensure_finite(name, value)?;
    if value < 0.0 {
        return Err(SimulationError::invalid(
            name,
            format!("must be non-negative (got {})", value),
        ));
    }
    Ok(value)
}

fn positive(name: &'static str, value: f64) -> Result<f64, SimulationError> {
    let value = ensure_finite(name, value)?;
    if value <= 0.0 {
        return Err(SimulationError::invalid(
            name,
            format!("must be positive (got {})", value),
        ));
    }
    Ok(value)
}

fn population(n_h: u64) -> Result<u64, SimulationError> {
    if n_h == 0 {
        return Err(SimulationError::invalid(
            "n_h",
            "human population must be positive (got 0)",
        ));
    }
    Ok(n_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dengue() -> Result<Parameters, SimulationError> {
        Parameters::new(0.35, 0.15, 1.0 / 7.0, 1.0 / 5.0, 1.0 / 14.0, 100_000)
    }

    #[test]
    fn test_valid_parameters() {
        let params = dengue().unwrap();
        assert_eq!(params.n_h(), 100_000);
        assert_eq!(params.beta_h(), 0.35);
        assert_eq!(params.mu_v(), 1.0 / 14.0);
    }

    #[test]
    fn test_zero_transmission_is_allowed() {
        assert!(Parameters::new(0.0, 0.0, 0.1, 0.2, 0.1, 10).is_ok());
    }

    #[test]
    fn test_zero_population_is_rejected() {
        let err = Parameters::new(0.35, 0.15, 0.1, 0.2, 0.1, 0).unwrap_err();
        match err {
            SimulationError::InvalidParameter { name, .. } => assert_eq!(name, "n_h"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_rates_are_rejected() {
        let cases = [
            ("beta_h", Parameters::new(-0.1, 0.15, 0.1, 0.2, 0.1, 10)),
            ("beta_v", Parameters::new(0.1, -0.15, 0.1, 0.2, 0.1, 10)),
            ("gamma", Parameters::new(0.1, 0.15, -0.1, 0.2, 0.1, 10)),
            ("epsilon", Parameters::new(0.1, 0.15, 0.1, -0.2, 0.1, 10)),
            ("mu_v", Parameters::new(0.1, 0.15, 0.1, 0.2, -0.1, 10)),
        ];
        for (expected, result) in cases {
            match result {
                Err(SimulationError::InvalidParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("{expected}: unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn test_non_finite_rates_are_rejected() {
        assert!(Parameters::new(f64::NAN, 0.15, 0.1, 0.2, 0.1, 10).is_err());
        assert!(Parameters::new(0.1, f64::INFINITY, 0.1, 0.2, 0.1, 10).is_err());
    }

    #[test]
    fn test_settings_conversion() {
        let raw = ParameterSettings {
            beta_h: 0.35,
            beta_v: 0.15,
            gamma: 1.0 / 7.0,
            epsilon: 0.2,
            mu_v: 1.0 / 14.0,
            n_h: -5,
        };
        assert!(Parameters::try_from(raw.clone()).is_err());

        let params = Parameters::try_from(ParameterSettings { n_h: 500, ..raw }).unwrap();
        assert_eq!(params.n_h(), 500);
        assert_eq!(ParameterSettings::from(params).n_h, 500);
    }

    #[test]
    fn test_force_of_infection() {
        let params = dengue().unwrap();
        assert_eq!(params.force_of_infection_human(0.0), 0.0);
        assert!((params.force_of_infection_human(100_000.0) - 0.35).abs() < 1e-15);
        assert!((params.force_of_infection_vector(50_000.0) - 0.075).abs() < 1e-15);
    }
}
