//! Persistence port for the application state.
//!
//! The state is always loaded and saved as one snapshot. `JsonFileStore` keeps it
//! in a pretty-printed JSON file; tests use an in-memory `MemoryStore`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::db::Database;
use crate::error::Result;

/// Load/save of the full state snapshot.
pub trait StateStore {
    fn load(&self) -> Result<Database>;
    fn save(&self, db: &Database) -> Result<()>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    /// A missing file loads as an empty state; an unreadable or corrupt one is
    /// an error so it never gets overwritten by accident.
    fn load(&self) -> Result<Database> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no state file yet, starting empty");
            return Ok(Database::default());
        }
        let buf = fs::read_to_string(&self.path)?;
        let mut db: Database = serde_json::from_str(&buf)?;
        db.reconcile_ids();
        Ok(db)
    }

    /// Atomic-ish write via temp + rename.
    fn save(&self, db: &Database) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(db)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), "saved state");
        Ok(())
    }
}

/// In-memory snapshot, round-tripped through JSON like the file store.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: std::cell::RefCell<Option<String>>,
}

#[cfg(test)]
impl StateStore for MemoryStore {
    fn load(&self) -> Result<Database> {
        match self.blob.borrow().as_deref() {
            Some(json) => {
                let mut db: Database = serde_json::from_str(json)?;
                db.reconcile_ids();
                Ok(db)
            }
            None => Ok(Database::default()),
        }
    }

    fn save(&self, db: &Database) -> Result<()> {
        *self.blob.borrow_mut() = Some(serde_json::to_string(db)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DaybookError;
    use crate::fields::Frequency;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::BTreeSet;

    fn sample() -> Database {
        let mut db = Database::default();
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let id = db
            .add_task(d, "Plan week", NaiveTime::from_hms_opt(8, 0, 0), Some("home".into()))
            .unwrap();
        db.add_subtask(d, id, "Review calendar").unwrap();
        db.add_rule("Gym", None, None, Frequency::Weekly { weekdays: BTreeSet::from([1, 3, 5]) })
            .unwrap();
        db.materialize(&[d], d, false);
        db.add_backlog("Someday", None, None).unwrap();
        db.toggle_task(d, id).unwrap();
        db.mark_day_complete(d);
        db
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("daybook.json"));
        assert_eq!(store.load().unwrap(), Database::default());

        let db = sample();
        store.save(&db).unwrap();
        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), db);
    }

    #[test]
    fn test_file_store_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daybook.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(DaybookError::Json(_))));
        // Left untouched.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_file_store_loads_sparse_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daybook.json");
        fs::write(
            &path,
            r#"{"days":{"2024-03-04":[{"id":9,"text":"Legacy"}]},
                "rules":[{"id":3,"text":"Old weekly","frequency":"weekly"}]}"#,
        )
        .unwrap();
        let mut db = JsonFileStore::new(&path).load().unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(db.bucket(d)[0].text, "Legacy");
        assert!(!db.bucket(d)[0].completed);
        // Weekly rule with no weekdays is inert, not an error.
        assert_eq!(db.materialize(&[d], d, false), 0);
        assert_eq!(db.add_task(d, "New", None, None).unwrap(), 10);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::default();
        assert_eq!(store.load().unwrap(), Database::default());
        let db = sample();
        store.save(&db).unwrap();
        assert_eq!(store.load().unwrap(), db);
    }
}
