use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde_derive::Serialize;

use super::compartments::{Compartment, Compartments, NSTATES};

/// Time series produced by one simulation run
///
/// Rows of [Trajectory::states] follow [Trajectory::times], which are strictly increasing.
/// Columns follow [Compartment] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Array1<f64>,
    states: Array2<f64>,
    stats: SolverStats,
    warnings: Vec<Warning>,
}

/// Work done by the solver during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SolverStats {
    pub num_eval: u32,
    pub accepted_steps: u32,
    pub rejected_steps: u32,
}

impl std::fmt::Display for SolverStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} RHS evaluations, {} accepted steps, {} rejected steps",
            self.num_eval, self.accepted_steps, self.rejected_steps
        )
    }
}

/// Advisory findings attached to a completed trajectory
///
/// None of these fail a run: the model does not enforce positivity, so they point at
/// questionable parameters or tolerances rather than at a solver fault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Warning {
    /// A compartment dropped below the negativity tolerance.
    /// `time` is the first offending sample, `min` the most negative value seen.
    NegativeCompartment {
        compartment: Compartment,
        time: f64,
        min: f64,
    },
    /// The initial human compartments do not add up to the population used as denominator.
    PopulationMismatch { n_h: u64, initial: f64 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NegativeCompartment {
                compartment,
                time,
                min,
            } => write!(
                f,
                "compartment {} became negative at t = {} (minimum {})",
                compartment, time, min
            ),
            Warning::PopulationMismatch { n_h, initial } => write!(
                f,
                "initial human compartments sum to {} but N_h is {}",
                initial, n_h
            ),
        }
    }
}

impl Trajectory {
    pub(crate) fn new(samples: Vec<(f64, Compartments)>, stats: SolverStats) -> Self {
        let times = Array1::from_iter(samples.iter().map(|(t, _)| *t));
        let rows: Vec<[f64; NSTATES]> = samples.iter().map(|(_, c)| c.to_array()).collect();
        let states = Array2::from_shape_fn((rows.len(), NSTATES), |(r, c)| rows[r][c]);
        Trajectory {
            times,
            states,
            stats,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    /// Matrix of states, one row per sample and one column per compartment
    pub fn states(&self) -> &Array2<f64> {
        &self.states
    }

    /// State at sample `index`, or `None` when out of bounds
    pub fn state(&self, index: usize) -> Option<Compartments> {
        if index >= self.len() {
            return None;
        }
        let row = self.states.row(index);
        Some(Compartments::from_array([
            row[0], row[1], row[2], row[3], row[4], row[5],
        ]))
    }

    /// All values of a single compartment
    pub fn column(&self, compartment: Compartment) -> ArrayView1<'_, f64> {
        self.states.column(compartment.index())
    }

    pub fn first(&self) -> Option<(f64, Compartments)> {
        self.state(0).map(|c| (self.times[0], c))
    }

    pub fn last(&self) -> Option<(f64, Compartments)> {
        let index = self.len().checked_sub(1)?;
        self.state(index).map(|c| (self.times[index], c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, Compartments)> + '_ {
        (0..self.len()).filter_map(move |i| self.state(i).map(|c| (self.times[i], c)))
    }

    /// S + E + I + R at every sample
    pub fn human_totals(&self) -> Array1<f64> {
        self.states
            .slice(ndarray::s![.., 0..4])
            .sum_axis(Axis(1))
    }

    /// Sv + Iv at every sample
    pub fn vector_totals(&self) -> Array1<f64> {
        self.states
            .slice(ndarray::s![.., 4..NSTATES])
            .sum_axis(Axis(1))
    }

    /// Time and value of the maximum of `compartment`
    ///
    /// Returns the earliest sample when the maximum is attained more than once.
    pub fn peak(&self, compartment: Compartment) -> Option<(f64, f64)> {
        let column = self.column(compartment);
        let mut best: Option<(usize, f64)> = None;
        for (index, &value) in column.iter().enumerate() {
            match best {
                Some((_, max)) if value <= max => {}
                _ => best = Some((index, value)),
            }
        }
        best.map(|(index, value)| (self.times[index], value))
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Scan every compartment for values below `-tolerance`
    ///
    /// Produces at most one [Warning::NegativeCompartment] per compartment.
    pub(crate) fn negativity_warnings(&self, tolerance: f64) -> Vec<Warning> {
        Compartment::ALL
            .iter()
            .filter_map(|&compartment| {
                let column = self.column(compartment);
                let first = column.iter().position(|&v| v < -tolerance)?;
                let min = column.iter().cloned().fold(f64::INFINITY, f64::min);
                Some(Warning::NegativeCompartment {
                    compartment,
                    time: self.times[first],
                    min,
                })
            })
            .collect()
    }
}
