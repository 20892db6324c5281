use ode_solvers::Vector6;
use serde_derive::{Deserialize, Serialize};

use crate::error::{ensure_finite, SimulationError};

/// Number of compartments in the SEIR-V state vector
pub const NSTATES: usize = 6;

/// Dense state vector used by the solver, in [Compartment] order
pub type State = Vector6<f64>;

/// Identifies one compartment of the state vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    /// Susceptible humans
    S,
    /// Exposed (incubating) humans
    E,
    /// Infectious humans
    I,
    /// Recovered humans
    R,
    /// Susceptible mosquitoes
    Sv,
    /// Infectious mosquitoes
    Iv,
}

impl Compartment {
    pub const ALL: [Compartment; NSTATES] = [
        Compartment::S,
        Compartment::E,
        Compartment::I,
        Compartment::R,
        Compartment::Sv,
        Compartment::Iv,
    ];

    /// Position of the compartment in the state vector
    pub fn index(self) -> usize {
        match self {
            Compartment::S => 0,
            Compartment::E => 1,
            Compartment::I => 2,
            Compartment::R => 3,
            Compartment::Sv => 4,
            Compartment::Iv => 5,
        }
    }

    /// Short label, used as CSV header
    pub fn label(self) -> &'static str {
        match self {
            Compartment::S => "S",
            Compartment::E => "E",
            Compartment::I => "I",
            Compartment::R => "R",
            Compartment::Sv => "Sv",
            Compartment::Iv => "Iv",
        }
    }
}

impl std::fmt::Display for Compartment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Values of the six compartments at one point in time
///
/// Also used for derivatives, in which case the fields hold rates of change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Compartments {
    pub s: f64,
    pub e: f64,
    pub i: f64,
    pub r: f64,
    pub sv: f64,
    pub iv: f64,
}

impl Compartments {
    /// Create a validated initial state: every compartment must be finite and non-negative
    pub fn new(s: f64, e: f64, i: f64, r: f64, sv: f64, iv: f64) -> Result<Self, SimulationError> {
        let state = Compartments { s, e, i, r, sv, iv };
        for (name, value) in [
            ("S", s),
            ("E", e),
            ("I", i),
            ("R", r),
            ("Sv", sv),
            ("Iv", iv),
        ] {
            ensure_finite(name, value)?;
            if value < 0.0 {
                return Err(SimulationError::invalid(
                    name,
                    format!("initial compartment must be non-negative (got {})", value),
                ));
            }
        }
        Ok(state)
    }

    pub fn get(&self, compartment: Compartment) -> f64 {
        match compartment {
            Compartment::S => self.s,
            Compartment::E => self.e,
            Compartment::I => self.i,
            Compartment::R => self.r,
            Compartment::Sv => self.sv,
            Compartment::Iv => self.iv,
        }
    }

    /// Total human population, S + E + I + R
    pub fn humans(&self) -> f64 {
        self.s + self.e + self.i + self.r
    }

    /// Total mosquito population, Sv + Iv
    pub fn vectors(&self) -> f64 {
        self.sv + self.iv
    }

    pub fn to_array(&self) -> [f64; NSTATES] {
        [self.s, self.e, self.i, self.r, self.sv, self.iv]
    }

    pub fn from_array(y: [f64; NSTATES]) -> Self {
        let [s, e, i, r, sv, iv] = y;
        Compartments { s, e, i, r, sv, iv }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl TryFrom<[f64; NSTATES]> for Compartments {
    type Error = SimulationError;

    fn try_from(y: [f64; NSTATES]) -> Result<Self, Self::Error> {
        let [s, e, i, r, sv, iv] = y;
        Compartments::new(s, e, i, r, sv, iv)
    }
}

impl From<&State> for Compartments {
    fn from(y: &State) -> Self {
        Compartments {
            s: y[0],
            e: y[1],
            i: y[2],
            r: y[3],
            sv: y[4],
            iv: y[5],
        }
    }
}

impl From<Compartments> for State {
    fn from(c: Compartments) -> Self {
        State::new(c.s, c.e, c.i, c.r, c.sv, c.iv)
    }
}
