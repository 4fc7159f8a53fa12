//! Persistence of the annotated record set

use crate::error::Result;
use crate::types::ScoredTransaction;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk encoding, picked from the destination extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// `.json` selects JSON; anything else is CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

/// Writes scored records to a destination file
#[derive(Debug, Clone)]
pub struct ResultWriter {
    path: PathBuf,
    format: OutputFormat,
}

impl ResultWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = OutputFormat::from_path(&path);
        Self { path, format }
    }

    /// Persist all records.
    ///
    /// Data goes to a sibling `.partial` file that is renamed over the
    /// destination only once fully flushed.
    pub fn persist(&self, records: &[ScoredTransaction]) -> Result<()> {
        let staging = self.staging_path();
        debug!(staging = %staging.display(), "Writing scored records");

        let written = File::create(&staging)
            .map_err(Into::into)
            .and_then(|file| self.write_to(BufWriter::new(file), records));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        fs::rename(&staging, &self.path)?;

        info!(
            path = %self.path.display(),
            format = ?self.format,
            records = records.len(),
            "Scored records persisted"
        );
        Ok(())
    }

    /// Encode records into any writer
    pub fn write_to<W: Write>(&self, writer: W, records: &[ScoredTransaction]) -> Result<()> {
        match self.format {
            OutputFormat::Csv => write_csv(writer, records),
            OutputFormat::Json => write_json(writer, records),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("output"));
        name.push(".partial");
        self.path.with_file_name(name)
    }
}

fn write_csv<W: Write>(writer: W, records: &[ScoredTransaction]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serialize() emits the header with the first row only
        writer.write_record(crate::types::OUTPUT_COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(mut writer: W, records: &[ScoredTransaction]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
