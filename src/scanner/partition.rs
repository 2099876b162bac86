use crate::artifact::{ArtifactFile, TimeSource};
use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use glob::Pattern;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// One calendar day of one collection on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayPartition {
    pub collection: String,
    pub date: NaiveDate,
}

impl DayPartition {
    pub fn new(collection: &str, date: NaiveDate) -> Self {
        Self {
            collection: collection.to_string(),
            date,
        }
    }

    /// `<collection>/<YYYY>/<MM>/<DD>` relative to the storage base.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.collection)
            .join(format!("{:04}", self.date.year()))
            .join(format!("{:02}", self.date.month()))
            .join(format!("{:02}", self.date.day()))
    }
}

/// Lists the artifacts of single day partitions, newest first.
#[derive(Debug, Clone)]
pub struct PartitionScanner {
    base_dir: PathBuf,
    time_source: TimeSource,
    patterns: HashMap<String, Pattern>,
}

impl PartitionScanner {
    pub fn new(base_dir: impl Into<PathBuf>, time_source: TimeSource) -> Self {
        Self {
            base_dir: base_dir.into(),
            time_source,
            patterns: HashMap::new(),
        }
    }

    /// Only consider file names matching `pattern` for `collection`.
    pub fn with_pattern(mut self, collection: &str, pattern: &str) -> Result<Self> {
        self.patterns
            .insert(collection.to_string(), Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn partition_dir(&self, partition: &DayPartition) -> PathBuf {
        self.base_dir.join(partition.relative_path())
    }

    /// Artifacts in the partition for `date`, sorted newest first.
    ///
    /// A missing directory yields an empty listing. Names that do not parse
    /// are skipped. Any other I/O failure is returned as [`Error::Storage`].
    pub fn list(&self, collection: &str, date: NaiveDate) -> Result<Vec<ArtifactFile>> {
        let dir = self.partition_dir(&DayPartition::new(collection, date));

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                trace!("No partition at {}", dir.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(Error::storage(&dir, err)),
        };

        let entries: Vec<DirEntry> = entries
            .collect::<io::Result<_>>()
            .map_err(|err| Error::storage(&dir, err))?;

        let pattern = self.patterns.get(collection);
        let inspected: Vec<Option<ArtifactFile>> = entries
            .par_iter()
            .map(|entry| self.inspect(collection, pattern, entry))
            .collect::<Result<_>>()?;

        let mut files: Vec<ArtifactFile> = inspected.into_iter().flatten().collect();
        files.sort_by(|a, b| {
            b.capture_time
                .cmp(&a.capture_time)
                .then_with(|| a.path.cmp(&b.path))
        });

        debug!("Listed {} artifacts in {}", files.len(), dir.display());
        Ok(files)
    }

    fn inspect(
        &self,
        collection: &str,
        pattern: Option<&Pattern>,
        entry: &DirEntry,
    ) -> Result<Option<ArtifactFile>> {
        let path = entry.path();

        let file_type = entry
            .file_type()
            .map_err(|err| Error::storage(&path, err))?;
        if !file_type.is_file() {
            return Ok(None);
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(pattern) = pattern {
            if !pattern.matches(&name) {
                return Ok(None);
            }
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            // Removed between the listing and the stat.
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::storage(&path, err)),
        };

        match self.time_source.capture_time(collection, &path, &metadata) {
            Ok(capture_time) => Ok(Some(ArtifactFile { path, capture_time })),
            Err(Error::MalformedName(name)) => {
                trace!("Skipping {}: malformed artifact name", name);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::artifact_name;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_relative_path_is_zero_padded() {
        let partition = DayPartition::new("pavlof", date(2024, 3, 1));
        assert_eq!(partition.relative_path(), PathBuf::from("pavlof/2024/03/01"));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = tempdir().unwrap();
        let scanner = PartitionScanner::new(tmp.path(), TimeSource::Name);
        assert!(scanner.list("pavlof", date(2024, 3, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_lists_newest_first_and_skips_junk() {
        let tmp = tempdir().unwrap();
        let scanner = PartitionScanner::new(tmp.path(), TimeSource::Name);
        let dir = scanner.partition_dir(&DayPartition::new("pavlof", date(2024, 3, 1)));
        fs::create_dir_all(dir.join("nested")).unwrap();

        let early = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap();
        for (time, kind) in [(early, "wfs"), (late, "slice"), (late, "wfs")] {
            fs::write(dir.join(artifact_name("pavlof", time, kind, "png")), b"png").unwrap();
        }
        fs::write(dir.join("notes.txt"), b"x").unwrap();
        fs::write(dir.join("pavlof_2024_bad_wfs.png"), b"x").unwrap();

        let files = scanner.list("pavlof", date(2024, 3, 1)).unwrap();
        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(
            names,
            vec![
                "pavlof_20240301_1730_slice.png",
                "pavlof_20240301_1730_wfs.png",
                "pavlof_20240301_0900_wfs.png",
            ]
        );
        assert_eq!(files[0].capture_time, late);
    }

    #[test]
    fn test_pattern_restricts_listing() {
        let tmp = tempdir().unwrap();
        let scanner = PartitionScanner::new(tmp.path(), TimeSource::Name)
            .with_pattern("pavlof", "*.png")
            .unwrap();
        let dir = scanner.partition_dir(&DayPartition::new("pavlof", date(2024, 3, 1)));
        fs::create_dir_all(&dir).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        fs::write(dir.join(artifact_name("pavlof", time, "wfs", "png")), b"png").unwrap();
        fs::write(dir.join(artifact_name("pavlof", time, "wfs", "png.tmp")), b"partial").unwrap();

        let files = scanner.list("pavlof", date(2024, 3, 1)).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].file_name().ends_with(".png"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = PartitionScanner::new("/tmp", TimeSource::Name).with_pattern("pavlof", "[");
        assert!(matches!(result, Err(Error::Pattern(_))));
    }

    #[test]
    fn test_mtime_source_uses_modification_time() {
        let tmp = tempdir().unwrap();
        let scanner = PartitionScanner::new(tmp.path(), TimeSource::Mtime);
        let dir = scanner.partition_dir(&DayPartition::new("pavlof", date(2024, 3, 1)));
        fs::create_dir_all(&dir).unwrap();

        let older = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 3, 1, 8, 10, 0).unwrap();
        for (name, time) in [("a.png", newer), ("b.png", older)] {
            let file = fs::File::create(dir.join(name)).unwrap();
            file.set_modified(time.into()).unwrap();
        }

        let files = scanner.list("pavlof", date(2024, 3, 1)).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name(), "a.png");
        assert_eq!(files[0].capture_time, newer);
        assert_eq!(files[1].capture_time, older);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_partition_is_storage_error() {
        let tmp = tempdir().unwrap();
        let scanner = PartitionScanner::new(tmp.path(), TimeSource::Name);
        let dir = scanner.partition_dir(&DayPartition::new("pavlof", date(2024, 3, 1)));
        // A regular file where the day directory should be.
        fs::create_dir_all(dir.parent().unwrap()).unwrap();
        fs::write(&dir, b"not a directory").unwrap();

        let err = scanner.list("pavlof", date(2024, 3, 1)).unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err:?}");
    }
}
