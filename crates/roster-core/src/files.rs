//! Download files posted in a chat channel, marking each message once done.

use crate::chat::{ChatClient, ChatFile, ChatMessage};
use crate::error::{Result, RosterError};
use crate::io::atomic_write;
use crate::ledger::Ledger;
use std::path::{Path, PathBuf};

const HISTORY_LIMIT: u32 = 200;

pub fn ledger_key(file: &ChatFile) -> String {
    format!("file-{}", file.id)
}

pub const DOWNLOADED: &str = "downloaded";

/// Messages with files that carry neither our marker reaction nor a ledger
/// entry for every file.
pub fn pending<'a>(
    messages: &'a [ChatMessage],
    marker: &str,
    me: &str,
    ledger: &Ledger,
) -> Vec<&'a ChatMessage> {
    messages
        .iter()
        .filter(|m| !m.files.is_empty())
        .filter(|m| !m.reacted_by(marker, me))
        .filter(|m| {
            !m.files
                .iter()
                .all(|f| ledger.already_done(&ledger_key(f), DOWNLOADED))
        })
        .collect()
}

/// `{millis}.{id}.{name}` so repeated names never collide, even within one
/// message.
pub fn target_path(dir: &Path, millis: i64, file: &ChatFile) -> PathBuf {
    let name = Path::new(&file.name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.id.clone());
    dir.join(format!("{millis}.{}.{name}", file.id))
}

pub struct Downloader<'a> {
    pub chat: &'a ChatClient,
    pub channel: String,
    pub dir: PathBuf,
    pub marker: String,
    pub me: String,
}

impl Downloader<'_> {
    /// Download every pending file. With `live` false nothing is written
    /// and no message is marked. Returns the paths written (or that would
    /// be written).
    pub fn run(&self, ledger: &mut Ledger, live: bool) -> Result<Vec<PathBuf>> {
        let messages = self.chat.history(&self.channel, HISTORY_LIMIT)?;
        let todo = pending(&messages, &self.marker, &self.me, ledger);
        tracing::info!("{} message(s) with files to download in {}", todo.len(), self.channel);
        let mut written = Vec::new();
        for message in todo {
            // Only mark the message once nothing in it is left to fetch.
            let mut complete = true;
            for file in &message.files {
                if ledger.already_done(&ledger_key(file), DOWNLOADED) {
                    continue;
                }
                let path = target_path(&self.dir, chrono::Utc::now().timestamp_millis(), file);
                if !live {
                    println!("  would download {} to {}", file.name, path.display());
                    written.push(path);
                    continue;
                }
                let Some(url) = file.url_private_download.as_deref() else {
                    let e = RosterError::partial(format!("file {}", file.id), "no download url");
                    tracing::warn!("{e}");
                    complete = false;
                    continue;
                };
                let data = self.chat.download(url)?;
                atomic_write(&path, &data)?;
                ledger.mark_done(&ledger_key(file), DOWNLOADED);
                tracing::info!("downloaded file: {}", file.name);
                written.push(path);
            }
            if live && complete {
                self.chat.add_reaction(&self.channel, &message.ts, &self.marker)?;
            } else if live {
                tracing::warn!("message {} left unmarked until all its files download", message.ts);
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    fn messages() -> Vec<ChatMessage> {
        serde_json::from_value(serde_json::json!([
            {"ts": "1.0", "text": "no files"},
            {"ts": "2.0", "files": [{"id": "F2", "name": "a.pdf"}],
             "reactions": [{"name": "heavy_check_mark", "users": ["UBOT"]}]},
            {"ts": "3.0", "files": [{"id": "F3", "name": "b.pdf"}]},
            {"ts": "4.0", "files": [{"id": "F4", "name": "c.pdf"}],
             "reactions": [{"name": "heavy_check_mark", "users": ["USOMEONE"]}]}
        ]))
        .unwrap()
    }

    #[test]
    fn pending_skips_marked_and_recorded() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::load(&dir.path().join("l.json")).unwrap();
        ledger.mark_done("file-F3", DOWNLOADED);
        let msgs = messages();
        let todo = pending(&msgs, "heavy_check_mark", "UBOT", &ledger);
        let ts: Vec<&str> = todo.iter().map(|m| m.ts.as_str()).collect();
        assert_eq!(ts, vec!["4.0"]);
    }

    #[test]
    fn live_run_writes_and_marks() {
        let mut server = mockito::Server::new();
        let url = format!("{}/files/F3", server.url());
        let body = serde_json::json!({"ok": true, "messages": [
            {"ts": "3.0", "files": [{"id": "F3", "name": "../b.pdf", "url_private_download": url}]}
        ]});
        let _history = server
            .mock("POST", "/conversations.history")
            .with_body(body.to_string())
            .create();
        let _file = server
            .mock("GET", "/files/F3")
            .match_header("authorization", "Bearer xoxb")
            .with_body("PDFDATA")
            .create();
        let react = server
            .mock("POST", "/reactions.add")
            .match_body(Matcher::UrlEncoded("timestamp".into(), "3.0".into()))
            .with_body(r#"{"ok": true}"#)
            .create();

        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::load(&dir.path().join("l.json")).unwrap();
        let chat = ChatClient::new(&server.url(), "xoxb");
        let dl = Downloader {
            chat: &chat,
            channel: "C1".into(),
            dir: dir.path().join("downloads"),
            marker: "heavy_check_mark".into(),
            me: "UBOT".into(),
        };
        let written = dl.run(&mut ledger, true).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].to_string_lossy().ends_with(".F3.b.pdf"));
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), "PDFDATA");
        assert!(ledger.already_done("file-F3", DOWNLOADED));
        react.assert();
    }

    #[test]
    fn same_name_files_get_distinct_paths() {
        let files: Vec<ChatFile> = serde_json::from_value(serde_json::json!([
            {"id": "F1", "name": "scan.pdf"},
            {"id": "F2", "name": "scan.pdf"}
        ]))
        .unwrap();
        let dir = Path::new("/tmp/dl");
        assert_ne!(target_path(dir, 1000, &files[0]), target_path(dir, 1000, &files[1]));
    }

    #[test]
    fn message_with_unfetchable_file_stays_unmarked() {
        let mut server = mockito::Server::new();
        let url = format!("{}/files/F6", server.url());
        let body = serde_json::json!({"ok": true, "messages": [
            {"ts": "5.0", "files": [
                {"id": "F5", "name": "gone.pdf"},
                {"id": "F6", "name": "ok.pdf", "url_private_download": url}
            ]}
        ]});
        let _history = server
            .mock("POST", "/conversations.history")
            .with_body(body.to_string())
            .create();
        let _file = server.mock("GET", "/files/F6").with_body("OK").create();
        let react = server
            .mock("POST", "/reactions.add")
            .with_body(r#"{"ok": true}"#)
            .expect(0)
            .create();

        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::load(&dir.path().join("l.json")).unwrap();
        let chat = ChatClient::new(&server.url(), "xoxb");
        let dl = Downloader {
            chat: &chat,
            channel: "C1".into(),
            dir: dir.path().join("downloads"),
            marker: "heavy_check_mark".into(),
            me: "UBOT".into(),
        };
        let written = dl.run(&mut ledger, true).unwrap();
        assert_eq!(written.len(), 1);
        assert!(ledger.already_done("file-F6", DOWNLOADED));
        assert!(!ledger.already_done("file-F5", DOWNLOADED));
        react.assert();

        let msgs: Vec<ChatMessage> =
            serde_json::from_value(body["messages"].clone()).unwrap();
        assert_eq!(pending(&msgs, "heavy_check_mark", "UBOT", &ledger).len(), 1);
    }
}
