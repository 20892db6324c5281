use std::time::Instant;

use eyre::{Result, WrapErr};

use crate::routines::output::{write_series, write_settings, write_trajectory, Series};
use crate::routines::{logger, settings::Settings};
use crate::structs::compartments::Compartment;
use crate::structs::trajectory::Trajectory;

/// Primary entrypoint
///
/// Configures logging, runs the simulation described by `settings` and, if `output.write`
/// is set, writes `trajectory.csv`, `series.csv` and `settings.json` to the output folder.
pub fn run(settings: Settings) -> Result<Trajectory> {
    logger::setup_log(&settings)?;
    tracing::info!("Starting SEIR-V simulation");

    match settings.output.write {
        true => tracing::info!("Output files will be written to {}", settings.output.path),
        false => tracing::info!(
            "Output files will not be written - set `write = true` in the [output] section to enable output files"
        ),
    }

    let trajectory = run_internal(&settings)?;

    if settings.output.write {
        let folder = settings.output.path.as_str();
        write_settings(&settings, folder)?;
        write_trajectory(&trajectory, folder)?;
        write_series(&trajectory, folder, &Series::infectious(settings.output.iv_scale))?;
    }

    Ok(trajectory)
}

/// Alternative entrypoint, meant for embedding
///
/// Validates the settings and runs the simulation without touching the logger or the file system.
pub fn run_internal(settings: &Settings) -> Result<Trajectory> {
    let now = Instant::now();

    let scenario = settings
        .scenario("settings")
        .wrap_err("Invalid simulation settings")?;
    let simulator = settings
        .simulator()
        .wrap_err("Invalid solver settings")?;

    tracing::info!(
        "Simulating t = {} to {} for a population of {} humans",
        scenario.span.start,
        scenario.span.end,
        scenario.parameters.n_h()
    );

    let times = scenario.output.times(&scenario.span);
    let trajectory = match simulator.simulate(
        &scenario.parameters,
        &scenario.initial,
        scenario.span,
        times.as_deref(),
    ) {
        Ok(trajectory) => trajectory,
        Err(err) => {
            tracing::error!("Simulation failed: {}", err);
            return Err(err.into());
        }
    };

    summarize(&trajectory);
    tracing::info!("Simulation complete after {:.2?}", now.elapsed());
    Ok(trajectory)
}

fn summarize(trajectory: &Trajectory) {
    tracing::info!(
        "Trajectory has {} samples ({})",
        trajectory.len(),
        trajectory.stats()
    );
    if let Some((time, value)) = trajectory.peak(Compartment::I) {
        tracing::info!("Infectious humans peak at t = {:.1} with {:.0}", time, value);
    }
    if let Some((time, value)) = trajectory.peak(Compartment::Iv) {
        tracing::info!(
            "Infectious mosquitoes peak at t = {:.1} with {:.0}",
            time,
            value
        );
    }
    if let Some((time, state)) = trajectory.last() {
        tracing::info!(
            "At t = {:.1}: {:.0} recovered, {:.0} still susceptible",
            time,
            state.r,
            state.s
        );
    }
}
