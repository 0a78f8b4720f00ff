//! Bulk title editing through a JSON file: export the directory's titles,
//! edit them by hand, then write the changes back.

use crate::config::ContactId;
use crate::directory::Contact;
use crate::error::{Result, RosterError};
use crate::io::atomic_write;
use crate::plan::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleEntry {
    /// Chat user id the contact is linked to.
    pub chat: String,
    pub id: ContactId,
    pub name: String,
    pub title: String,
}

/// Linked contacts that carry a title, sorted by name.
pub fn entries(linked: &BTreeMap<String, &Contact>, title_field: &str) -> Vec<TitleEntry> {
    let mut out: Vec<TitleEntry> = linked
        .iter()
        .filter_map(|(chat, c)| {
            c.custom_field(title_field).map(|title| TitleEntry {
                chat: chat.clone(),
                id: c.id,
                name: c.name(),
                title: title.to_string(),
            })
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    out
}

pub fn save(path: &Path, entries: &[TitleEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    atomic_write(path, json.as_bytes())
}

pub fn load(path: &Path) -> Result<Vec<TitleEntry>> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|e| RosterError::Validation(format!("{} is malformed: {e}", path.display())))
}

/// One field update per edited entry. Entries whose title matches the
/// directory are left alone; entries for contacts without a title today are
/// always written.
pub fn plan_set(edited: &[TitleEntry], current: &[TitleEntry], title_field: &str) -> Vec<Action> {
    let now: BTreeMap<&str, &str> = current
        .iter()
        .map(|e| (e.chat.as_str(), e.title.as_str()))
        .collect();
    edited
        .iter()
        .filter(|e| {
            let same = now.get(e.chat.as_str()) == Some(&e.title.as_str());
            if same {
                tracing::debug!("title of {} ({}) unchanged", e.name, e.chat);
            }
            !same
        })
        .map(|e| Action::SetContactField {
            contact: e.id,
            field: title_field.to_string(),
            value: e.title.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn contacts() -> Vec<Contact> {
        serde_json::from_value(serde_json::json!([
            {"id": 1, "first_name": "Zed", "custom_fields": [{"id": "title", "value": "Treasurer"}]},
            {"id": 2, "first_name": "Ada", "custom_fields": [{"id": "title", "value": "President"}]},
            {"id": 3, "first_name": "Bo"}
        ]))
        .unwrap()
    }

    #[test]
    fn exports_titled_contacts_by_name() {
        let contacts = contacts();
        let linked = BTreeMap::from([
            ("U1".to_string(), &contacts[0]),
            ("U2".to_string(), &contacts[1]),
            ("U3".to_string(), &contacts[2]),
        ]);
        let list = entries(&linked, "title");
        let names: Vec<&str> = list.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Zed"]);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("titles.json");
        save(&path, &list).unwrap();
        assert_eq!(load(&path).unwrap(), list);
    }

    #[test]
    fn only_edited_titles_are_written() {
        let current = vec![TitleEntry {
            chat: "U1".into(),
            id: 1,
            name: "Zed".into(),
            title: "Treasurer".into(),
        }];
        let mut edited = current.clone();
        edited.push(TitleEntry {
            chat: "U3".into(),
            id: 3,
            name: "Bo".into(),
            title: "Secretary".into(),
        });
        assert_eq!(
            plan_set(&edited, &current, "title"),
            vec![Action::SetContactField {
                contact: 3,
                field: "title".into(),
                value: "Secretary".into(),
            }]
        );
        edited[0].title = "Past Treasurer".into();
        assert_eq!(plan_set(&edited, &current, "title").len(), 2);
    }

    #[test]
    fn malformed_file_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("titles.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(RosterError::Validation(_))));
    }
}
