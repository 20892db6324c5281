use config::Config as eConfig;
use serde_derive::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::simulator::{OutputGrid, Scenario, Simulator, SolverOptions, TimeSpan};
use crate::structs::compartments::Compartments;
use crate::structs::parameters::{ParameterSettings, Parameters};

/// Settings for one simulation run
///
/// Read from a TOML file with [Settings::from_file]. Any value can be overridden with an
/// environment variable prefixed by `SEIRV`, using `__` as separator, e.g. `SEIRV__SIMULATION__T_END=90`.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Settings {
    pub parameters: ParameterSettings,
    pub initial: Compartments,
    pub simulation: Simulation,
    #[serde(default)]
    pub solver: SolverOptions,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub log: Log,
}

/// Time horizon and reporting grid
///
/// `times` takes precedence over `points`. When neither is given the solver steps are reported.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Simulation {
    #[serde(default)]
    pub t_start: f64,
    pub t_end: f64,
    pub points: Option<usize>,
    pub times: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Output {
    /// Folder receiving the CSV files
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub write: bool,
    /// Display factor applied to infectious mosquitoes in the series output
    #[serde(default = "default_iv_scale")]
    pub iv_scale: f64,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            path: default_output_path(),
            write: true,
            iv_scale: default_iv_scale(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file name, relative to [Output::path]
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Settings {
    /// Read settings from a TOML file, applying `SEIRV__*` environment overrides
    pub fn from_file(path: &str) -> Result<Settings, config::ConfigError> {
        let parsed = eConfig::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix("SEIRV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        parsed.try_deserialize()
    }

    /// Parse settings from a TOML string, without environment overrides
    pub fn from_toml(contents: &str) -> Result<Settings, config::ConfigError> {
        eConfig::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn parameters(&self) -> Result<Parameters, SimulationError> {
        Parameters::try_from(self.parameters.clone())
    }

    pub fn initial(&self) -> Result<Compartments, SimulationError> {
        Compartments::try_from(self.initial.to_array())
    }

    pub fn span(&self) -> Result<TimeSpan, SimulationError> {
        TimeSpan::new(self.simulation.t_start, self.simulation.t_end)
    }

    pub fn output_grid(&self) -> OutputGrid {
        match (&self.simulation.times, self.simulation.points) {
            (Some(times), _) => OutputGrid::Times(times.clone()),
            (None, Some(points)) => OutputGrid::Uniform(points),
            (None, None) => OutputGrid::Steps,
        }
    }

    pub fn simulator(&self) -> Result<Simulator, SimulationError> {
        Simulator::new(self.solver)
    }

    /// Validate every section and assemble a [Scenario]
    pub fn scenario(&self, name: &str) -> Result<Scenario, SimulationError> {
        Ok(Scenario {
            name: name.to_string(),
            parameters: self.parameters()?,
            initial: self.initial()?,
            span: self.span()?,
            output: self.output_grid(),
        })
    }
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_path() -> String {
    "outputs/".to_string()
}

fn default_iv_scale() -> f64 {
    0.5
}
