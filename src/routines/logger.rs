use eyre::Result;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::routines::output::OutputFile;
use crate::routines::settings::Settings;

/// Setup logging for a simulation run
///
/// Uses the `tracing` crate, with `tracing-subscriber` for formatting.
/// The log level is taken from the `[log]` section of the settings and defaults to `info`.
/// Messages always go to stdout; if `log.file` is set they are also written to that file inside the output folder.
///
/// The library itself never calls this, so embedding applications keep control of their subscriber.
pub fn setup_log(settings: &Settings) -> Result<()> {
    let log_level = settings.log.level.as_str();
    let env_filter = EnvFilter::new(log_level);

    let subscriber = Registry::default().with(env_filter);

    let file_layer = match &settings.log.file {
        Some(name) => {
            let outputfile = OutputFile::new(&settings.output.path, name)?;
            Some(
                fmt::layer()
                    .with_writer(outputfile.file_owned())
                    .with_ansi(false)
                    .with_timer(CompactTimestamp),
            )
        }
        None => None,
    };

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false)
        .with_timer(CompactTimestamp);

    subscriber.with(file_layer).with(stdout_layer).try_init()?;
    tracing::debug!("Logging is configured with level: {}", log_level);

    Ok(())
}

#[derive(Clone)]
struct CompactTimestamp;

impl FormatTime for CompactTimestamp {
    fn format_time(
        &self,
        w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> Result<(), std::fmt::Error> {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
    }
}
