use crate::rl::q_learning::{QKey, QLearner};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// JSON file holding the Q-table as `{ "<state>|<action>": value }`.
pub struct QTableStore {
    path: PathBuf,
}

impl QTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes to `<path>.tmp` then renames over `path`. Non-finite values
    /// are not representable in JSON and are skipped.
    pub fn save(&self, learner: &QLearner) -> Result<usize> {
        let table: BTreeMap<String, f64> = learner
            .entries()
            .filter(|(_, v)| v.is_finite())
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(&table).context("serializing q-table")?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;

        Ok(table.len())
    }

    /// Strict load: a missing file is an empty table, anything unreadable
    /// is an error.
    pub fn load(&self) -> Result<Vec<(QKey, f64)>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let raw: BTreeMap<String, f64> =
            serde_json::from_str(&json).context("parsing q-table json")?;
        raw.into_iter()
            .map(|(k, v)| -> Result<(QKey, f64)> {
                let key: QKey = k.parse()?;
                Ok((key, v))
            })
            .collect()
    }

    /// Restores into `learner`; a corrupt file leaves it empty and the
    /// session carries on.
    pub fn load_into(&self, learner: &mut QLearner) -> usize {
        match self.load() {
            Ok(entries) => {
                let n = entries.len();
                learner.load_entries(entries);
                info!(entries = n, path = %self.path.display(), "Loaded Q-table");
                n
            }
            Err(e) => {
                warn!(error = ?e, path = %self.path.display(), "Q-table unreadable, starting empty");
                learner.clear();
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BetOutcome, Trend};
    use crate::rl::state::encode_state;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("dicetrader_q_{}_{}", std::process::id(), name))
            .join("q_values.json")
    }

    fn trained() -> QLearner {
        let mut q = QLearner::default();
        let s = encode_state(120.0, &[BetOutcome::Win], Trend::Bull);
        let s2 = encode_state(20.0, &[BetOutcome::Loss; 4], Trend::Bear);
        q.update(&s, 7, 0.1 + 0.2, &s2);
        q.update(&s2, 3, -1.0 / 3.0, &s);
        q.update(&s, 11, 123.456789, &s);
        q
    }

    #[test]
    fn test_save_clear_load_roundtrip() {
        let path = temp_path("roundtrip");
        let store = QTableStore::new(&path);
        let mut q = trained();
        let mut before: Vec<_> = q.entries().collect();

        assert_eq!(store.save(&q).unwrap(), 3);
        q.clear();
        assert_eq!(store.load_into(&mut q), 3);

        let mut after: Vec<_> = q.entries().collect();
        before.sort_by_key(|(k, _)| *k);
        after.sort_by_key(|(k, _)| *k);
        // bit-exact floats
        assert_eq!(before, after);

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        assert!(!PathBuf::from(tmp).exists());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = QTableStore::new(temp_path("missing"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let store = QTableStore::new(&path);
        let mut q = trained();

        fs::write(&path, "{ not json").unwrap();
        assert!(store.load().is_err());
        assert_eq!(store.load_into(&mut q), 0);
        assert!(q.is_empty());

        // valid json but a key that does not parse
        let mut q = trained();
        fs::write(&path, r#"{"(('low','bull'),7)": 1.0}"#).unwrap();
        assert_eq!(store.load_into(&mut q), 0);
        assert!(q.is_empty());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_format_is_flat_object() {
        let path = temp_path("format");
        let store = QTableStore::new(&path);
        let mut q = QLearner::default();
        let s = encode_state(10.0, &[], Trend::Bear);
        q.update(&s, 2, 10.0, &s);
        store.save(&q).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["low_bear_none_0_0|2"], serde_json::json!(1.0));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
