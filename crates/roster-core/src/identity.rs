use crate::config::DirectoryConfig;
use crate::directory::Contact;
use crate::error::RosterError;
use std::collections::BTreeMap;

/// Index records by a secondary key, refusing ambiguous keys.
///
/// Records without a key are ignored. When two or more records share a key,
/// none of them is indexed under it and one `PartialData` error per key is
/// returned alongside the index.
pub fn index_unique<'a, T, K>(records: &'a [T], key: K) -> (BTreeMap<String, &'a T>, Vec<RosterError>)
where
    K: Fn(&T) -> Option<String>,
{
    let mut buckets: BTreeMap<String, Vec<&'a T>> = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            buckets.entry(k).or_default().push(record);
        }
    }
    let mut index = BTreeMap::new();
    let mut errors = Vec::new();
    for (k, mut found) in buckets {
        if found.len() == 1 {
            if let Some(only) = found.pop() {
                index.insert(k, only);
            }
        } else {
            errors.push(RosterError::partial(
                format!("key {k}"),
                format!("shared by {} records", found.len()),
            ));
        }
    }
    (index, errors)
}

/// Normalise an email address for matching.
pub fn email_key(email: &str) -> Option<String> {
    let e = email.trim().to_lowercase();
    (!e.is_empty()).then_some(e)
}

/// Directory contacts that carry a chat user id, keyed by that id.
///
/// Contacts on the ignore list are left out. Ambiguous ids are logged and
/// dropped.
pub fn linked_contacts<'a>(
    contacts: &'a [Contact],
    cfg: &DirectoryConfig,
) -> BTreeMap<String, &'a Contact> {
    let (index, errors) = index_unique(contacts, |c| {
        if cfg.ignore.contains(&c.id) {
            return None;
        }
        c.custom_field(&cfg.fields.chat).map(str::to_string)
    });
    for e in errors {
        tracing::warn!("{e}");
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_are_dropped_and_reported() {
        let records = vec![
            (1, "a@x.org"),
            (2, "B@x.org"),
            (3, "b@x.org "),
            (4, ""),
        ];
        let (index, errors) = index_unique(&records, |r| email_key(r.1));
        assert_eq!(index.len(), 1);
        assert_eq!(index["a@x.org"].0, 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("b@x.org"));
        assert!(!errors[0].is_fatal());
    }

    #[test]
    fn linked_contacts_skip_ignored_and_shared_ids() {
        let contacts: Vec<Contact> = serde_json::from_str(
            r#"[
                {"id": 1, "custom_fields": [{"id": "chat", "value": "U1"}]},
                {"id": 2, "custom_fields": [{"id": "chat", "value": "U2"}]},
                {"id": 3, "custom_fields": [{"id": "chat", "value": "U2"}]},
                {"id": 4, "custom_fields": [{"id": "chat", "value": "U4"}]},
                {"id": 5}
            ]"#,
        )
        .unwrap();
        let mut cfg: DirectoryConfig = serde_json::from_value(serde_json::json!({
            "token": "t",
            "fields": {"chat": "chat", "title": "title"}
        }))
        .unwrap();
        cfg.ignore = vec![4];
        let index = linked_contacts(&contacts, &cfg);
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["U1"]);
    }
}
