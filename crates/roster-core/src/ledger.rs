use crate::error::{Result, RosterError};
use crate::io::{atomic_write, read_optional};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Persisted record of (context, state) pairs already handled.
///
/// The file is a flat JSON object of `context → [state, ...]`. It is read
/// whole on load and overwritten whole on save; entries are never removed.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    entries: BTreeMap<String, Vec<String>>,
    dirty: bool,
}

impl Ledger {
    /// Load the ledger at `path`. A missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = match read_optional(path)? {
            Some(data) if !data.trim().is_empty() => serde_json::from_str(&data).map_err(|e| {
                RosterError::Validation(format!("ledger {} is malformed: {e}", path.display()))
            })?,
            _ => BTreeMap::new(),
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            dirty: false,
        })
    }

    pub fn already_done(&self, context: &str, state: &str) -> bool {
        self.entries
            .get(context)
            .is_some_and(|states| states.iter().any(|s| s == state))
    }

    pub fn mark_done(&mut self, context: &str, state: &str) {
        let states = self.entries.entry(context.to_string()).or_default();
        if !states.iter().any(|s| s == state) {
            states.push(state.to_string());
            self.dirty = true;
        }
    }

    pub fn states(&self, context: &str) -> &[String] {
        self.entries
            .get(context)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite the ledger file with the full current contents.
    pub fn save(&mut self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.entries)?;
        atomic_write(&self.path, data.as_bytes())?;
        self.dirty = false;
        tracing::debug!("saved ledger with {} contexts to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.already_done("story-1", "3"));
    }

    #[test]
    fn marked_pairs_survive_a_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".roster/ledger.json");
        let mut ledger = Ledger::load(&path).unwrap();
        ledger.mark_done("story-42", "in-progress");
        assert!(ledger.already_done("story-42", "in-progress"));
        ledger.save().unwrap();

        let reloaded = Ledger::load(&path).unwrap();
        assert!(reloaded.already_done("story-42", "in-progress"));
        assert!(!reloaded.already_done("story-42", "done"));
    }

    #[test]
    fn transition_appends_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, r#"{"story-42": ["in-progress"]}"#).unwrap();

        let mut ledger = Ledger::load(&path).unwrap();
        assert!(ledger.already_done("story-42", "in-progress"));
        ledger.mark_done("story-42", "in-progress");
        assert!(!ledger.is_dirty());
        ledger.mark_done("story-42", "done");
        ledger.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"story-42": ["in-progress", "done"]}));
    }

    #[test]
    fn malformed_file_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            Ledger::load(&path),
            Err(RosterError::Validation(_))
        ));
    }
}
