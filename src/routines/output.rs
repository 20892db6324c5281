use std::fs::{create_dir_all, File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use eyre::{Result, WrapErr};

use crate::routines::settings::Settings;
use crate::structs::compartments::Compartment;
use crate::structs::trajectory::Trajectory;

/// One column of the series output: a compartment multiplied by a display factor
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub compartment: Compartment,
    pub scale: f64,
}

impl Series {
    pub fn new(label: &str, compartment: Compartment, scale: f64) -> Self {
        Series {
            label: label.to_string(),
            compartment,
            scale,
        }
    }

    /// Infectious humans and infectious mosquitoes scaled by `iv_scale`
    pub fn infectious(iv_scale: f64) -> Vec<Series> {
        vec![
            Series::new("infectious_humans", Compartment::I, 1.0),
            Series::new("infectious_vectors_scaled", Compartment::Iv, iv_scale),
        ]
    }
}

/// Writes the full trajectory to `trajectory.csv`, one row per sample
///
/// Header: `time,S,E,I,R,Sv,Iv`
pub fn write_trajectory(trajectory: &Trajectory, folder: &str) -> Result<PathBuf> {
    let outputfile = OutputFile::new(folder, "trajectory.csv")
        .wrap_err("Failed to create output file for the trajectory")?;
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_writer(outputfile.file());

    let mut header = vec!["time".to_string()];
    header.extend(Compartment::ALL.iter().map(|c| c.label().to_string()));
    writer.write_record(&header)?;

    for (time, row) in trajectory.times().iter().zip(trajectory.states().outer_iter()) {
        let mut record = vec![time.to_string()];
        record.extend(row.iter().map(|value| value.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    tracing::debug!("Trajectory written to {:?}", outputfile.relative_path());
    Ok(outputfile.relative_path().to_path_buf())
}

/// Writes selected, scaled compartments to `series.csv`, ready for plotting
pub fn write_series(trajectory: &Trajectory, folder: &str, series: &[Series]) -> Result<PathBuf> {
    let outputfile = OutputFile::new(folder, "series.csv")
        .wrap_err("Failed to create output file for the series")?;
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_writer(outputfile.file());

    let mut header = vec!["time".to_string()];
    header.extend(series.iter().map(|s| s.label.clone()));
    writer.write_record(&header)?;

    let columns: Vec<_> = series
        .iter()
        .map(|s| (trajectory.column(s.compartment), s.scale))
        .collect();
    for (index, time) in trajectory.times().iter().enumerate() {
        let mut record = vec![time.to_string()];
        record.extend(
            columns
                .iter()
                .map(|(column, scale)| (column[index] * scale).to_string()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    tracing::debug!("Series written to {:?}", outputfile.relative_path());
    Ok(outputfile.relative_path().to_path_buf())
}

/// Writes the resolved settings to `settings.json`
pub fn write_settings(settings: &Settings, folder: &str) -> Result<PathBuf> {
    let outputfile = OutputFile::new(folder, "settings.json")
        .wrap_err("Failed to create output file for the settings")?;
    serde_json::to_writer_pretty(outputfile.file(), settings)
        .wrap_err("Failed to serialize settings")?;
    Ok(outputfile.relative_path().to_path_buf())
}

/// A freshly truncated file inside the output folder
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .wrap_err_with(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_owned(self) -> File {
        self.file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}
