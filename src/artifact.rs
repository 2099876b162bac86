//! Capture-time derivation for artifact files.
//!
//! The producer names every artifact `<collection>_<YYYYMMDD>_<HHMM>_<kind>.<ext>`
//! in UTC. Deployments that cannot rely on that convention fall back to the
//! file's modification time.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

const NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M";

/// How a deployment derives `capture_time`. One strategy per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSource {
    #[default]
    Name,
    Mtime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub capture_time: DateTime<Utc>,
}

impl ArtifactFile {
    pub fn new(path: impl Into<PathBuf>, capture_time: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            capture_time,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl TimeSource {
    /// Derive the capture time of `path`. `metadata` is only consulted for
    /// [`TimeSource::Mtime`].
    pub fn capture_time(
        &self,
        collection: &str,
        path: &Path,
        metadata: &Metadata,
    ) -> Result<DateTime<Utc>> {
        match self {
            TimeSource::Name => {
                let name = path
                    .file_name()
                    .and_then(|f| f.to_str())
                    .ok_or_else(|| Error::MalformedName(path.to_string_lossy().into_owned()))?;
                parse_name_time(collection, name)
            }
            TimeSource::Mtime => metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .map_err(|e| Error::storage(path, e)),
        }
    }
}

/// Parse the UTC timestamp out of `<collection>_<YYYYMMDD>_<HHMM>_<kind>.<ext>`.
///
/// The kind suffix may be anything non-empty, including further underscores.
pub fn parse_name_time(collection: &str, file_name: &str) -> Result<DateTime<Utc>> {
    let malformed = || Error::MalformedName(file_name.to_string());

    let rest = file_name
        .strip_prefix(collection)
        .and_then(|r| r.strip_prefix('_'))
        .ok_or_else(malformed)?;

    let mut fields = rest.splitn(3, '_');
    let (date, time) = match (fields.next(), fields.next(), fields.next()) {
        (Some(date), Some(time), Some(kind)) if !kind.is_empty() => (date, time),
        _ => return Err(malformed()),
    };

    let all_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(date, 8) || !all_digits(time, 4) {
        return Err(malformed());
    }

    let naive = NaiveDateTime::parse_from_str(&format!("{date}_{time}"), NAME_TIME_FORMAT)
        .map_err(|_| malformed())?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// The file name the producer writes for one rendered view of a capture.
pub fn artifact_name(collection: &str, time: DateTime<Utc>, kind: &str, ext: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        collection,
        time.format(NAME_TIME_FORMAT),
        kind,
        ext
    )
}
