use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File layout constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "roster.yaml";
pub const STATE_DIR: &str = ".roster";
pub const LEDGER_FILE: &str = ".roster/ledger.json";
pub const DOWNLOADS_DIR: &str = ".roster/downloads";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn ledger_path(root: &Path) -> PathBuf {
    root.join(LEDGER_FILE)
}

/// Where downloaded chat files land unless the config names a directory.
/// Relative configured paths are resolved against `root`.
pub fn download_dir(root: &Path, configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => root.join(p),
        None => root.join(DOWNLOADS_DIR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_lives_in_state_dir() {
        let p = ledger_path(Path::new("/srv/roster"));
        assert_eq!(p, PathBuf::from("/srv/roster/.roster/ledger.json"));
    }

    #[test]
    fn download_dir_resolution() {
        let root = Path::new("/srv/roster");
        assert_eq!(
            download_dir(root, None),
            PathBuf::from("/srv/roster/.roster/downloads")
        );
        assert_eq!(
            download_dir(root, Some(Path::new("files"))),
            PathBuf::from("/srv/roster/files")
        );
        assert_eq!(
            download_dir(root, Some(Path::new("/tmp/files"))),
            PathBuf::from("/tmp/files")
        );
    }
}
