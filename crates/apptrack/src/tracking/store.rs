use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::domain::{
    format_timestamp, parse_timestamp, ApplicationStatus, ClassificationEvent, TrackingRecord,
};
use super::policy::StatusPolicy;

/// Column headers of the persisted table, in order.
pub const TABLE_HEADERS: [&str; 4] = ["Employer", "Role", "LastObserved", "Status"];

/// Effect of a single upsert on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// A record exists and the policy declined to overwrite it.
    Unchanged,
}

impl UpsertOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access tracking table {}: {}", .path.display(), .source)]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid tracking table data in {}: {}", .path.display(), .source)]
    Csv { path: PathBuf, source: csv::Error },
    #[error("row {} of {} is invalid: {}", .row, .path.display(), .reason)]
    InvalidRecord {
        path: PathBuf,
        row: usize,
        reason: String,
    },
}

/// In-memory tracking table backed by a CSV file.
///
/// The table is loaded once, mutated through [`RecordStore::upsert`], and
/// written back in full by [`RecordStore::save`]. Nothing reaches disk until
/// `save` runs. Concurrent writers are not coordinated here.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    records: Vec<TrackingRecord>,
}

impl RecordStore {
    /// Empty table that will be written to `path` on save.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// Reads the table at `path`; a missing file yields an empty table.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::empty(path)),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let records = read_records(file, &path)?;
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[TrackingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First row matching the identity key, scanning in table order.
    pub fn find(&self, employer: &str, role: &str) -> Option<&TrackingRecord> {
        self.records
            .iter()
            .find(|record| record.employer == employer && record.role == role)
    }

    pub fn upsert(&mut self, event: &ClassificationEvent) -> UpsertOutcome {
        let existing = self.records.iter_mut().find(|record| event.matches(record));

        match existing {
            Some(record) => {
                if !StatusPolicy::should_update(Some(&*record), event) {
                    return UpsertOutcome::Unchanged;
                }
                record.status = StatusPolicy::merged_status(Some(&*record), event);
                record.last_observed_at = event.observed_at;
                UpsertOutcome::Updated
            }
            None => {
                self.records.push(TrackingRecord::from_event(event));
                UpsertOutcome::Created
            }
        }
    }

    /// Rewrites the whole table. The file is written beside the target and
    /// renamed over it, so readers see either the old or the new table.
    pub fn save(&self) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let bytes = self.to_csv_bytes()?;
        let tmp_path = temp_path_for(&self.path);
        {
            let mut file = fs::File::create(&tmp_path).map_err(io_error)?;
            file.write_all(&bytes).map_err(io_error)?;
            file.sync_all().map_err(io_error)?;
        }
        fs::rename(&tmp_path, &self.path).map_err(io_error)
    }

    fn to_csv_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let csv_error = |source| StoreError::Csv {
            path: self.path.clone(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(TABLE_HEADERS).map_err(csv_error)?;
        for record in &self.records {
            writer.serialize(StoredRow::from(record)).map_err(csv_error)?;
        }

        writer.into_inner().map_err(|err| StoreError::Io {
            path: self.path.clone(),
            source: err.into_error(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    #[serde(rename = "Employer")]
    employer: String,
    #[serde(rename = "Role")]
    role: String,
    #[serde(rename = "LastObserved")]
    last_observed: String,
    #[serde(rename = "Status")]
    status: String,
}

impl From<&TrackingRecord> for StoredRow {
    fn from(record: &TrackingRecord) -> Self {
        Self {
            employer: record.employer.clone(),
            role: record.role.clone(),
            last_observed: format_timestamp(&record.last_observed_at),
            status: record.status.label().to_string(),
        }
    }
}

impl StoredRow {
    fn into_record(self) -> Result<TrackingRecord, String> {
        let last_observed_at = parse_timestamp(&self.last_observed)
            .ok_or_else(|| format!("unreadable timestamp '{}'", self.last_observed))?;
        let status = ApplicationStatus::from_stored(&self.status)
            .ok_or_else(|| format!("unrecognized status '{}'", self.status))?;

        Ok(TrackingRecord {
            employer: self.employer,
            role: self.role,
            last_observed_at,
            status,
        })
    }
}

fn read_records<R: Read>(reader: R, path: &Path) -> Result<Vec<TrackingRecord>, StoreError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, row) in csv_reader.deserialize::<StoredRow>().enumerate() {
        let row = row.map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        // Header occupies row 1.
        let record = row
            .into_record()
            .map_err(|reason| StoreError::InvalidRecord {
                path: path.to_path_buf(),
                row: index + 2,
                reason,
            })?;
        records.push(record);
    }

    Ok(records)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, day)
            .unwrap()
            .and_hms_opt(hour, 15, 0)
            .unwrap()
    }

    fn event(status: ApplicationStatus, employer: &str, role: &str, day: u32) -> ClassificationEvent {
        ClassificationEvent::new(status, employer, role, at(day, 9))
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = RecordStore::empty("unused.csv");
        let applied = event(ApplicationStatus::Applied, "Acme", "Engineer", 1);

        assert_eq!(store.upsert(&applied), UpsertOutcome::Created);
        let once = store.records().to_vec();
        assert_eq!(store.upsert(&applied), UpsertOutcome::Updated);
        assert_eq!(store.records(), once.as_slice());
    }

    #[test]
    fn upsert_keeps_identity_unique_and_rows_in_place() {
        let mut store = RecordStore::empty("unused.csv");
        store.upsert(&event(ApplicationStatus::Applied, "Acme", "Engineer", 1));
        store.upsert(&event(ApplicationStatus::Applied, "Globex", "Analyst", 2));
        store.upsert(&event(ApplicationStatus::Advancing, "Acme", "Engineer", 3));
        store.upsert(&event(ApplicationStatus::Applied, "acme", "Engineer", 4));

        let keys: Vec<_> = store.records().iter().map(TrackingRecord::key).collect();
        assert_eq!(
            keys,
            vec![
                ("Acme", "Engineer"),
                ("Globex", "Analyst"),
                ("acme", "Engineer")
            ]
        );
        let acme = store.find("Acme", "Engineer").expect("record present");
        assert_eq!(acme.status, ApplicationStatus::Advancing);
        assert_eq!(acme.last_observed_at, at(3, 9));
    }

    #[test]
    fn new_pair_appends_exactly_one_row() {
        let mut store = RecordStore::empty("unused.csv");
        store.upsert(&event(ApplicationStatus::Applied, "Acme", "Engineer", 1));
        let before = store.records().to_vec();

        let outcome = store.upsert(&event(ApplicationStatus::Rejected, "Umbrella", "Chemist", 2));

        assert_eq!(outcome, UpsertOutcome::Created);
        assert_eq!(store.len(), 2);
        assert_eq!(&store.records()[..1], before.as_slice());
        assert_eq!(store.records()[1].status, ApplicationStatus::Rejected);
    }

    #[test]
    fn unknown_event_leaves_existing_record_untouched() {
        let mut store = RecordStore::empty("unused.csv");
        store.upsert(&event(ApplicationStatus::Rejected, "Acme", "Engineer", 1));
        let before = store.records().to_vec();

        let outcome = store.upsert(&event(ApplicationStatus::Unknown, "Acme", "Engineer", 5));

        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(store.records(), before.as_slice());
    }

    #[test]
    fn last_write_wins_regardless_of_timestamps() {
        let mut store = RecordStore::empty("unused.csv");
        store.upsert(&event(ApplicationStatus::Applied, "Acme", "Engineer", 20));
        store.upsert(&event(ApplicationStatus::Rejected, "Acme", "Engineer", 3));

        let record = store.find("Acme", "Engineer").expect("record present");
        assert_eq!(record.status, ApplicationStatus::Rejected);
        assert_eq!(record.last_observed_at, at(3, 9));
    }

    #[test]
    fn missing_file_loads_as_empty_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RecordStore::load(dir.path().join("absent.csv")).expect("loads");
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_load_preserves_rows_and_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("tracking.csv");
        let mut store = RecordStore::empty(&path);
        store.upsert(&event(ApplicationStatus::Applied, "Acme Corp", "Backend Engineer", 1));
        store.upsert(&event(ApplicationStatus::Advancing, "Globex, Inc.", "Analyst", 2));
        store.save().expect("saves");

        let contents = fs::read_to_string(&path).expect("file written");
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Employer,Role,LastObserved,Status"));
        assert_eq!(
            lines.next(),
            Some("Acme Corp,Backend Engineer,2025-07-01 09:15:00,Applied")
        );
        assert!(!temp_path_for(&path).exists());

        let reloaded = RecordStore::load(&path).expect("reloads");
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn header_only_file_loads_as_empty_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracking.csv");
        fs::write(&path, "Employer,Role,LastObserved,Status\n").expect("write");
        assert!(RecordStore::load(&path).expect("loads").is_empty());
    }

    #[test]
    fn legacy_status_codes_are_readable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracking.csv");
        fs::write(
            &path,
            "Employer,Role,LastObserved,Status\nAcme,Engineer,2025-07-01 09:15:00,F\n",
        )
        .expect("write");

        let store = RecordStore::load(&path).expect("loads");
        assert_eq!(store.records()[0].status, ApplicationStatus::Rejected);
    }

    #[test]
    fn invalid_rows_report_their_position() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracking.csv");
        fs::write(
            &path,
            "Employer,Role,LastObserved,Status\n\
Acme,Engineer,2025-07-01 09:15:00,Applied\n\
Globex,Analyst,yesterday,Applied\n",
        )
        .expect("write");

        match RecordStore::load(&path) {
            Err(StoreError::InvalidRecord { row, reason, .. }) => {
                assert_eq!(row, 3);
                assert!(reason.contains("yesterday"));
            }
            other => panic!("expected invalid record error, got {other:?}"),
        }
    }
}
