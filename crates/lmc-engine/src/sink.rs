use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use lmc_core::{ErrorInfo, LmcError, ParameterTree};
use serde_json::json;

use crate::measures::MeasurementValue;
use crate::results::canonical_rp_key;

/// Receives ordered measurement rows, one per measurement tick.
///
/// The engine initializes the sink once per running-parameter value
/// (`begin_run`), announces the measurement names at the start of every
/// repetition, then streams rows. Implementations own their output
/// resources; the default writes tab-separated data files.
pub trait MeasurementSink {
    /// Identity tag and parameter-file stem of the sink implementation.
    fn name() -> &'static str
    where
        Self: Sized;

    /// Builds the sink from its parameter tree.
    fn from_parameters(params: ParameterTree) -> Result<Self, LmcError>
    where
        Self: Sized;

    /// The parameter tree the sink was built from.
    fn parameters(&self) -> &ParameterTree;

    /// Prepares the sink for one full chain execution identified by the
    /// execution mode and the active running-parameter value.
    fn begin_run(
        &mut self,
        mode: &str,
        rp_name: Option<&str>,
        rp_value: Option<f64>,
    ) -> Result<(), LmcError>;

    /// Announces the ordered measurement names for a repetition.
    fn begin_repetition(&mut self, measure_names: &[String], repetition: u32)
        -> Result<(), LmcError>;

    /// Records one ordered measurement row.
    fn record(&mut self, row: &[MeasurementValue]) -> Result<(), LmcError>;

    /// Flushes per-repetition output.
    fn end_repetition(&mut self) -> Result<(), LmcError>;

    /// Directory receiving data files, created lazily on first access.
    fn data_dir(&self) -> Result<PathBuf, LmcError>;

    /// File stem identifying the active run (mode plus running-parameter
    /// value); also used for the provenance parameter snapshot.
    fn run_filename(&self) -> String;
}

/// Default sink writing human-readable tab-separated data files.
///
/// File layout: `<mode>[_<rp_name>=<rp_value>].dat` inside the configured
/// data directory. The first line is a tab-separated header of measurement
/// names, emitted only for repetition 0; every following line is one
/// tab-separated row of stringified measurement values.
pub struct ReadableMeasure {
    params: ParameterTree,
    data_dir: PathBuf,
    mode: String,
    running_parameter: Option<String>,
    rp_value: Option<f64>,
    writer: Option<BufWriter<File>>,
}

impl ReadableMeasure {
    /// Creates a sink writing into `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let mut params = ParameterTree::new();
        params.insert("data_dir", json!(data_dir.display().to_string()));
        Self {
            params,
            data_dir,
            mode: String::new(),
            running_parameter: None,
            rp_value: None,
            writer: None,
        }
    }

    /// Writes the sink parameters as `readable_measure_params.json` into
    /// `dir`.
    pub fn write_to_file(&self, dir: &std::path::Path) -> Result<PathBuf, LmcError> {
        let mut params = self.params.clone();
        params.set_name_tag("measurement", Self::name());
        params.write_to_file(dir, &format!("{}_params", Self::name()))
    }

    fn open_writer(&self) -> Result<BufWriter<File>, LmcError> {
        let path = self.data_dir()?.join(format!("{}.dat", self.run_filename()));
        let file = File::create(&path).map_err(|err| {
            LmcError::Serde(
                ErrorInfo::new("measure-file-create", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Ok(BufWriter::new(file))
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, LmcError> {
        self.writer.as_mut().ok_or_else(|| {
            LmcError::Config(ErrorInfo::new(
                "sink-uninitialized",
                "measurement sink used before begin_run",
            ))
        })
    }

    fn write_line(&mut self, fields: &[String]) -> Result<(), LmcError> {
        let line = fields.join("\t");
        let writer = self.writer()?;
        writeln!(writer, "{line}").map_err(|err| {
            LmcError::Serde(ErrorInfo::new("measure-write", err.to_string()))
        })
    }
}

impl MeasurementSink for ReadableMeasure {
    fn name() -> &'static str {
        "readable_measure"
    }

    fn from_parameters(params: ParameterTree) -> Result<Self, LmcError> {
        let data_dir: String = params.get_or("data_dir", "./data/".to_string())?;
        Ok(Self {
            params,
            data_dir: PathBuf::from(data_dir),
            mode: String::new(),
            running_parameter: None,
            rp_value: None,
            writer: None,
        })
    }

    fn parameters(&self) -> &ParameterTree {
        &self.params
    }

    fn begin_run(
        &mut self,
        mode: &str,
        rp_name: Option<&str>,
        rp_value: Option<f64>,
    ) -> Result<(), LmcError> {
        self.mode = mode.to_string();
        self.running_parameter = rp_name.map(str::to_string);
        self.rp_value = rp_value;
        self.writer = Some(self.open_writer()?);
        Ok(())
    }

    fn begin_repetition(
        &mut self,
        measure_names: &[String],
        repetition: u32,
    ) -> Result<(), LmcError> {
        if repetition == 0 {
            self.write_line(measure_names)?;
        }
        Ok(())
    }

    fn record(&mut self, row: &[MeasurementValue]) -> Result<(), LmcError> {
        let fields: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        self.write_line(&fields)
    }

    fn end_repetition(&mut self) -> Result<(), LmcError> {
        self.writer()?.flush().map_err(|err| {
            LmcError::Serde(ErrorInfo::new("measure-flush", err.to_string()))
        })
    }

    fn data_dir(&self) -> Result<PathBuf, LmcError> {
        fs::create_dir_all(&self.data_dir).map_err(|err| {
            LmcError::Serde(
                ErrorInfo::new("data-dir-create", err.to_string())
                    .with_context("path", self.data_dir.display().to_string()),
            )
        })?;
        Ok(self.data_dir.clone())
    }

    fn run_filename(&self) -> String {
        match &self.running_parameter {
            None => self.mode.clone(),
            Some(name) => format!(
                "{}_{}={}",
                self.mode,
                name,
                canonical_rp_key(self.rp_value)
            ),
        }
    }
}
