//! Chat notice for a document added to the document store.

use crate::config::DocumentConfig;
use crate::error::{Result, RosterError};

/// Document details handed over by the document store's post-consume hook.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAdded {
    pub id: String,
    pub file_name: String,
    pub correspondent: String,
    pub download_url: String,
    pub created: String,
}

impl DocumentAdded {
    /// Read `DOCUMENT_*` variables through `lookup`. A missing or `None`
    /// correspondent becomes `UNKNOWN`.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| RosterError::Validation(format!("{name} is not set")))
        };
        let correspondent = lookup("DOCUMENT_CORRESPONDENT")
            .filter(|c| !c.is_empty() && c != "None")
            .unwrap_or_else(|| "UNKNOWN".to_string());
        Ok(Self {
            id: required("DOCUMENT_ID")?,
            file_name: required("DOCUMENT_FILE_NAME")?,
            correspondent,
            download_url: lookup("DOCUMENT_DOWNLOAD_URL").unwrap_or_default(),
            created: lookup("DOCUMENT_CREATED").unwrap_or_default(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn message(&self, cfg: &DocumentConfig) -> String {
        let base = cfg.base_url.trim_end_matches('/');
        format!(
            "<{base}/documents/{}/details|{}> (for {} at {}) was added to the <{base}|document store>.\n\
             You can download it from <{base}{}|here> if needed.",
            self.id, self.file_name, self.correspondent, self.created, self.download_url
        )
    }
}
