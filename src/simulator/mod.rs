pub(crate) mod dense;
pub mod model;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ode_solvers::dop_shared::OutputType;
use ode_solvers::{Dopri5, System};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};

use self::dense::{Node, StepLog};
use self::model::Seirv;
use crate::error::{ensure_finite, FailureReason, SimulationError};
use crate::structs::compartments::{Compartments, State};
use crate::structs::parameters::Parameters;
use crate::structs::trajectory::{SolverStats, Trajectory, Warning};

const RTOL: f64 = 1e-6;
const ATOL: f64 = 1e-9;
const MAX_STEPS: usize = 100_000;
const NEGATIVITY_TOLERANCE: f64 = 1e-6;

/// Relative slack used when deciding that the solver reached the end of the span
const END_TOLERANCE: f64 = 1e-9;

/// Relative slack allowed between the initial human compartments and N_h
const POPULATION_TOLERANCE: f64 = 1e-9;

// Step control of the Dormand-Prince stepper
const SAFETY_FACTOR: f64 = 0.9;
const BETA: f64 = 0.04;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;
const STIFFNESS_CHECKS: u32 = 1000;

/// Closed time interval `[start, end]` to integrate over
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Result<Self, SimulationError> {
        let span = TimeSpan { start, end };
        span.validate()?;
        Ok(span)
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    fn validate(&self) -> Result<(), SimulationError> {
        ensure_finite("t_span", self.start)?;
        ensure_finite("t_span", self.end)?;
        if self.start >= self.end {
            return Err(SimulationError::invalid(
                "t_span",
                format!(
                    "start must be before end (got {} >= {})",
                    self.start, self.end
                ),
            ));
        }
        Ok(())
    }

    fn reached(&self, t: f64) -> bool {
        (t - self.end).abs() <= END_TOLERANCE * self.end.abs().max(1.0)
    }
}

/// Tolerances and guards for the Dormand-Prince solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// Maximum number of accepted steps before the run is abandoned
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Wall-clock limit for a single run, in seconds
    #[serde(default)]
    pub max_seconds: Option<f64>,
    /// Negative values down to `-negativity_tolerance` are treated as round-off
    #[serde(default = "default_negativity_tolerance")]
    pub negativity_tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            rtol: RTOL,
            atol: ATOL,
            max_steps: MAX_STEPS,
            max_seconds: None,
            negativity_tolerance: NEGATIVITY_TOLERANCE,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), SimulationError> {
        for (name, value) in [("rtol", self.rtol), ("atol", self.atol)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimulationError::invalid(
                    name,
                    format!("tolerance must be finite and positive (got {})", value),
                ));
            }
        }
        if self.max_steps == 0 {
            return Err(SimulationError::invalid(
                "max_steps",
                "at least one step must be allowed",
            ));
        }
        if let Some(seconds) = self.max_seconds {
            if !(seconds.is_finite() && seconds > 0.0) {
                return Err(SimulationError::invalid(
                    "max_seconds",
                    format!("must be finite and positive (got {})", seconds),
                ));
            }
        }
        if !(self.negativity_tolerance.is_finite() && self.negativity_tolerance >= 0.0) {
            return Err(SimulationError::invalid(
                "negativity_tolerance",
                format!(
                    "must be finite and non-negative (got {})",
                    self.negativity_tolerance
                ),
            ));
        }
        Ok(())
    }
}

fn default_rtol() -> f64 {
    RTOL
}

fn default_atol() -> f64 {
    ATOL
}

fn default_max_steps() -> usize {
    MAX_STEPS
}

fn default_negativity_tolerance() -> f64 {
    NEGATIVITY_TOLERANCE
}

/// Which times a trajectory reports
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum OutputGrid {
    /// The solver's accepted steps, starting at the beginning of the span
    #[default]
    Steps,
    /// `n` evenly spaced times covering the span, both ends included
    Uniform(usize),
    /// Explicit times inside the span
    Times(Vec<f64>),
}

impl OutputGrid {
    /// Output times for `span`, or `None` when the solver steps are reported
    pub fn times(&self, span: &TimeSpan) -> Option<Vec<f64>> {
        match self {
            OutputGrid::Steps => None,
            OutputGrid::Uniform(n) => Some(linspace(span.start, span.end, *n)),
            OutputGrid::Times(times) => Some(times.clone()),
        }
    }
}

/// `n` evenly spaced values from `start` to `end`, both included
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

fn validate_output_times(times: &[f64], span: &TimeSpan) -> Result<(), SimulationError> {
    let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
        return Err(SimulationError::invalid(
            "output_times",
            "at least one output time is required",
        ));
    };
    for &t in times {
        ensure_finite("output_times", t)?;
    }
    if let Some(pair) = times.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(SimulationError::invalid(
            "output_times",
            format!(
                "times must be strictly increasing (got {} then {})",
                pair[0], pair[1]
            ),
        ));
    }
    if first < span.start || last > span.end {
        return Err(SimulationError::invalid(
            "output_times",
            format!(
                "times must lie within [{}, {}] (got {} to {})",
                span.start, span.end, first, last
            ),
        ));
    }
    Ok(())
}

/// Run one simulation with the default [SolverOptions]
///
/// When `output_times` is `None` the trajectory reports every accepted solver step.
pub fn simulate(
    params: &Parameters,
    initial: &Compartments,
    span: TimeSpan,
    output_times: Option<&[f64]>,
) -> Result<Trajectory, SimulationError> {
    Simulator::default().simulate(params, initial, span, output_times)
}

/// Integrates the SEIR-V model with a configured Dormand-Prince 5(4) solver
#[derive(Debug, Clone, Copy, Default)]
pub struct Simulator {
    options: SolverOptions,
}

impl Simulator {
    pub fn new(options: SolverOptions) -> Result<Self, SimulationError> {
        options.validate()?;
        Ok(Simulator { options })
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn simulate(
        &self,
        params: &Parameters,
        initial: &Compartments,
        span: TimeSpan,
        output_times: Option<&[f64]>,
    ) -> Result<Trajectory, SimulationError> {
        span.validate()?;
        if let Some(times) = output_times {
            validate_output_times(times, &span)?;
        }
        // Re-run the checks of `Compartments::new`, the fields are public
        let initial = Compartments::try_from(initial.to_array())?;

        let mut warnings = Vec::new();
        let n_h = params.n_h();
        let humans = initial.humans();
        if (humans - n_h as f64).abs() > POPULATION_TOLERANCE * n_h as f64 {
            tracing::warn!(
                "Initial human compartments sum to {} but N_h is {}",
                humans,
                n_h
            );
            warnings.push(Warning::PopulationMismatch {
                n_h,
                initial: humans,
            });
        }

        let model = Seirv::new(*params);
        let (log, outcome) = self.integrate(model, initial, span);

        let samples = |log: &StepLog| -> Vec<(f64, Compartments)> {
            match output_times {
                None => log
                    .nodes()
                    .iter()
                    .map(|node| (node.t, Compartments::from(&node.y)))
                    .collect(),
                Some(times) => times
                    .iter()
                    .map_while(|&t| log.evaluate(t).map(|y| (t, Compartments::from(&y))))
                    .collect(),
            }
        };

        match outcome {
            Ok(stats) => {
                tracing::debug!(
                    "Integration over [{}, {}] finished: {}",
                    span.start,
                    span.end,
                    stats
                );
                let trajectory = Trajectory::new(samples(&log), stats);
                warnings.extend(trajectory.negativity_warnings(self.options.negativity_tolerance));
                for warning in &warnings {
                    tracing::warn!("{}", warning);
                }
                Ok(trajectory.with_warnings(warnings))
            }
            Err((time, reason)) => {
                tracing::debug!("Integration stopped at t = {}: {}", time, reason);
                let stats = SolverStats {
                    accepted_steps: log.steps() as u32,
                    ..SolverStats::default()
                };
                Err(SimulationError::IntegrationFailure {
                    time,
                    reason,
                    partial: Box::new(Trajectory::new(samples(&log), stats).with_warnings(warnings)),
                })
            }
        }
    }

    /// Drive the stepper over `span`, recording every accepted step
    ///
    /// Returns the step log together with the solver statistics, or the last reached
    /// time and the reason the run stopped early.
    fn integrate(
        &self,
        model: Seirv,
        initial: Compartments,
        span: TimeSpan,
    ) -> (StepLog, Result<SolverStats, (f64, FailureReason)>) {
        let y0: State = initial.into();
        let log = Rc::new(RefCell::new(StepLog::default()));
        log.borrow_mut().push(Node {
            t: span.start,
            y: y0,
            dy: model.rhs(span.start, &y0),
        });

        let stop = Rc::new(RefCell::new(None));
        let stepper_system = Stepper {
            model,
            log: Rc::clone(&log),
            stop: Rc::clone(&stop),
            max_steps: self.options.max_steps,
            deadline: self
                .options
                .max_seconds
                .map(|seconds| (Instant::now(), Duration::from_secs_f64(seconds))),
        };

        // Sparse output hands `solout` the state of each accepted step; dense output
        // would hand it the last sample of the fixed `dx` grid instead
        let mut stepper = Dopri5::from_param(
            stepper_system,
            span.start,
            span.end,
            span.duration(),
            y0,
            self.options.rtol,
            self.options.atol,
            SAFETY_FACTOR,
            BETA,
            FAC_MIN,
            FAC_MAX,
            span.duration(),
            0.0,
            u32::try_from(self.options.max_steps.saturating_mul(4)).unwrap_or(u32::MAX),
            STIFFNESS_CHECKS,
            OutputType::Sparse,
        );
        let result = stepper.integrate();

        let mut log = log.replace(StepLog::default());
        let last_time = log.last().map(|node| node.t).unwrap_or(span.start);
        let stopped = stop.borrow_mut().take();
        let outcome = match (result, stopped) {
            (Err(err), _) => Err((last_time, FailureReason::Solver(err.to_string()))),
            (Ok(_), Some(reason)) => Err((last_time, reason)),
            (Ok(_), None) if !span.reached(last_time) => Err((
                last_time,
                FailureReason::Solver("stopped before the end of the time span".to_string()),
            )),
            (Ok(stats), None) => {
                log.pin_last(span.end);
                Ok(SolverStats {
                    num_eval: stats.num_eval,
                    accepted_steps: stats.accepted_steps,
                    rejected_steps: stats.rejected_steps,
                })
            }
        };
        (log, outcome)
    }
}

/// Adapts [Seirv] to the stepper and records accepted steps
struct Stepper {
    model: Seirv,
    log: Rc<RefCell<StepLog>>,
    stop: Rc<RefCell<Option<FailureReason>>>,
    max_steps: usize,
    deadline: Option<(Instant, Duration)>,
}

impl Stepper {
    fn halt(&self, reason: FailureReason) -> bool {
        *self.stop.borrow_mut() = Some(reason);
        true
    }
}

impl System<f64, State> for Stepper {
    fn system(&self, t: f64, y: &State, dy: &mut State) {
        self.model.system(t, y, dy);
    }

    fn solout(&mut self, t: f64, y: &State, _dy: &State) -> bool {
        if !(t.is_finite() && y.iter().all(|v| v.is_finite())) {
            return self.halt(FailureReason::NonFiniteState);
        }

        let steps = {
            let mut log = self.log.borrow_mut();
            if log.last().is_some_and(|node| t <= node.t) {
                return false;
            }
            log.push(Node {
                t,
                y: *y,
                dy: self.model.rhs(t, y),
            });
            log.steps()
        };

        if steps > self.max_steps {
            return self.halt(FailureReason::StepLimit(self.max_steps));
        }
        if let Some((started, limit)) = self.deadline {
            if started.elapsed() > limit {
                return self.halt(FailureReason::TimeLimit(limit));
            }
        }
        false
    }
}

/// A named, self-contained simulation input
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub parameters: Parameters,
    pub initial: Compartments,
    pub span: TimeSpan,
    pub output: OutputGrid,
}

/// Simulate independent scenarios in parallel
///
/// Runs share nothing; results are returned in the order of `scenarios`.
pub fn simulate_batch(
    simulator: &Simulator,
    scenarios: &[Scenario],
) -> Vec<Result<Trajectory, SimulationError>> {
    scenarios
        .par_iter()
        .map(|scenario| {
            let times = scenario.output.times(&scenario.span);
            let result = simulator.simulate(
                &scenario.parameters,
                &scenario.initial,
                scenario.span,
                times.as_deref(),
            );
            if let Err(err) = &result {
                tracing::warn!("Scenario {} failed: {}", scenario.name, err);
            }
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace() {
        let grid = linspace(0.0, 120.0, 120);
        assert_eq!(grid.len(), 120);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[119], 120.0);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));

        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_time_span_validation() {
        assert!(TimeSpan::new(0.0, 120.0).is_ok());
        assert!(TimeSpan::new(5.0, 5.0).is_err());
        assert!(TimeSpan::new(10.0, 0.0).is_err());
        assert!(TimeSpan::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_output_times_validation() {
        let span = TimeSpan::new(0.0, 10.0).unwrap();
        assert!(validate_output_times(&[0.0, 5.0, 10.0], &span).is_ok());
        assert!(validate_output_times(&[], &span).is_err());
        assert!(validate_output_times(&[0.0, 5.0, 5.0], &span).is_err());
        assert!(validate_output_times(&[3.0, 1.0], &span).is_err());
        assert!(validate_output_times(&[-1.0, 5.0], &span).is_err());
        assert!(validate_output_times(&[1.0, 10.5], &span).is_err());
        assert!(validate_output_times(&[1.0, f64::NAN], &span).is_err());
    }

    #[test]
    fn test_solver_options_validation() {
        assert!(SolverOptions::default().validate().is_ok());

        let bad = [
            SolverOptions {
                rtol: 0.0,
                ..SolverOptions::default()
            },
            SolverOptions {
                atol: f64::NAN,
                ..SolverOptions::default()
            },
            SolverOptions {
                max_steps: 0,
                ..SolverOptions::default()
            },
            SolverOptions {
                max_seconds: Some(-1.0),
                ..SolverOptions::default()
            },
            SolverOptions {
                negativity_tolerance: -1e-3,
                ..SolverOptions::default()
            },
        ];
        for options in bad {
            assert!(Simulator::new(options).is_err(), "{options:?}");
        }
    }

    #[test]
    fn test_output_grid_times() {
        let span = TimeSpan::new(0.0, 4.0).unwrap();
        assert_eq!(OutputGrid::Steps.times(&span), None);
        assert_eq!(
            OutputGrid::Uniform(5).times(&span),
            Some(vec![0.0, 1.0, 2.0, 3.0, 4.0])
        );
        assert_eq!(
            OutputGrid::Times(vec![0.5, 1.5]).times(&span),
            Some(vec![0.5, 1.5])
        );
    }
}
