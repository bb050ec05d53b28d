//! File exports.
//!
//! Every writer goes through `OutputDir`, which creates the directory on
//! demand and applies the overwrite policy before touching an existing file.

pub mod cryptact;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// What to do when an export target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Ask on stdin; only `y` overwrites.
    #[default]
    Prompt,
    Always,
    Never,
}

/// Export destination with its overwrite policy.
#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
    policy: OverwritePolicy,
}

impl OutputDir {
    pub fn new(dir: impl Into<PathBuf>, policy: OverwritePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn join(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub fn with_policy(&self, policy: OverwritePolicy) -> Self {
        Self {
            dir: self.dir.clone(),
            policy,
        }
    }

    /// Resolve `filename` to a writable path, or `None` if overwrite was declined.
    pub fn target(&self, filename: &str) -> Result<Option<PathBuf>> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))?;

        let path = self.dir.join(filename);
        if !path.exists() {
            return Ok(Some(path));
        }

        let overwrite = match self.policy {
            OverwritePolicy::Always => true,
            OverwritePolicy::Never => false,
            OverwritePolicy::Prompt => {
                let stdin = std::io::stdin();
                confirm_overwrite(&path, &mut stdin.lock(), &mut std::io::stdout())?
            }
        };

        if overwrite {
            Ok(Some(path))
        } else {
            info!(path = %path.display(), "File not saved.");
            Ok(None)
        }
    }

    /// Write `data` as 2-space-indented JSON.
    pub fn save_json<T: Serialize + ?Sized>(&self, data: &T, filename: &str) -> Result<Option<PathBuf>> {
        let Some(path) = self.target(filename)? else {
            return Ok(None);
        };
        let json = serde_json::to_string_pretty(data).context("Failed to serialise JSON export")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "JSON file saved");
        Ok(Some(path))
    }

    /// Write a header row followed by `rows`. An empty slice still gets headers.
    pub fn write_csv<R: Serialize>(
        &self,
        headers: &[&str],
        rows: &[R],
        filename: &str,
    ) -> Result<Option<PathBuf>> {
        let Some(path) = self.target(filename)? else {
            return Ok(None);
        };
        write_csv_to(&path, headers, rows)?;
        info!(path = %path.display(), rows = rows.len(), "CSV file saved");
        Ok(Some(path))
    }
}

/// Write a CSV file without any overwrite checks.
pub fn write_csv_to<R: Serialize>(path: &Path, headers: &[&str], rows: &[R]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(headers)?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Ask whether to overwrite `path`. Anything but `y`/`Y` declines.
pub fn confirm_overwrite(path: &Path, input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
    write!(out, "{} already exists. Overwrite? (y/N) ", path.display())?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// `all_txns_{source}_N={n}_{date}.json`
pub fn raw_dump_filename(source: &str, count: usize, today: NaiveDate) -> String {
    format!("all_txns_{source}_N={count}_{today}.json")
}
