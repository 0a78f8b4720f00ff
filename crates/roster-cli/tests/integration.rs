#![allow(deprecated)]
use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use tempfile::TempDir;

fn roster(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("roster").unwrap();
    cmd.current_dir(dir.path()).env("ROSTER_ROOT", dir.path());
    cmd
}

fn write_config(dir: &TempDir, server_url: &str, extra: &str) {
    let yaml = format!(
        r#"
directory:
  base_url: {server_url}
  token: dir-token
  domain: makers
  fields:
    chat: chat
  groups:
    members: [1]
chat:
  base_url: {server_url}
  bot_token: xoxb-test
  user_token: xoxp-test
  notification_channel: CNOTIFY
{extra}"#
    );
    std::fs::write(dir.path().join("roster.yaml"), yaml).unwrap();
}

// ---------------------------------------------------------------------------
// roster config validate
// ---------------------------------------------------------------------------

#[test]
fn config_validate_accepts_minimal_config() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "http://127.0.0.1:9", "");
    roster(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_json_lists_warnings() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "http://127.0.0.1:9",
        "triggers:\n  Front door:\n    functions: [demo]\n",
    );
    roster(&dir)
        .args(["config", "validate", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trigger_channel"));
}

#[test]
fn unknown_trigger_action_fails_before_any_call() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "http://127.0.0.1:9",
        "triggers:\n  Front door:\n    functions: [make_coffee]\n",
    );
    roster(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("make_coffee"));
}

#[test]
fn missing_config_exits_1() {
    let dir = TempDir::new().unwrap();
    roster(&dir)
        .arg("sync-channels")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config not found"));
}

// ---------------------------------------------------------------------------
// roster operator-report
// ---------------------------------------------------------------------------

#[test]
fn operator_report_without_name_lists_reports_and_fails() {
    let mut server = mockito::Server::new();
    let _groups = server
        .mock("GET", "/groups")
        .match_query(Matcher::UrlEncoded("access_token".into(), "dir-token".into()))
        .with_body(r#"[{"id": 5, "label": "Machine Operator - Laser"}]"#)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url(), "reports:\n  groups:\n    laser: [5]\n");
    roster(&dir)
        .arg("operator-report")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Available reports:"))
        .stdout(predicate::str::contains("    Laser (5)"));
}

#[test]
fn operator_report_unknown_name_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "http://127.0.0.1:9", "reports:\n  groups:\n    laser: [5]\n");
    roster(&dir)
        .args(["operator-report", "lathe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("report lathe not found"));
}

#[test]
fn operator_report_prints_table() {
    let mut server = mockito::Server::new();
    let _group = server
        .mock("GET", "/groups/5")
        .match_query(Matcher::Any)
        .with_body(r#"{"id": 5, "label": "Machine Operator - Laser", "description": "url=https://wiki/laser"}"#)
        .create();
    let _contacts = server
        .mock("GET", "/contacts")
        .match_query(Matcher::Any)
        .with_body(
            r#"[
            {"id": 1, "first_name": "ada", "last_name": "lovelace", "groups": [{"id": 5}]},
            {"id": 2, "first_name": "Bo", "groups": [{"id": 9}]}
        ]"#,
        )
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url(), "reports:\n  groups:\n    laser: [5]\n");
    roster(&dir)
        .args(["operator-report", "laser"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| Operator | [Laser](https://wiki/laser) |"))
        .stdout(predicate::str::contains("| Ada Lovelace | ✅ |"))
        .stdout(predicate::str::contains("Bo").not());
}

// ---------------------------------------------------------------------------
// roster sync-channels
// ---------------------------------------------------------------------------

#[test]
fn sync_channels_dry_run_plans_without_inviting() {
    let mut server = mockito::Server::new();
    let _contacts = server
        .mock("GET", "/contacts")
        .match_query(Matcher::Any)
        .with_body(
            r#"[
            {"id": 1, "custom_fields": [{"id": "chat", "value": "U1"}], "groups": [{"id": 12}]},
            {"id": 2, "custom_fields": [{"id": "chat", "value": "U2"}], "groups": [{"id": 12}]}
        ]"#,
        )
        .create();
    let _members = server
        .mock("POST", "/conversations.members")
        .with_body(r#"{"ok": true, "members": ["U2"], "response_metadata": {"next_cursor": ""}}"#)
        .create();
    let invite = server
        .mock("POST", "/conversations.invite")
        .expect(0)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url(), "channels:\n  by_group:\n    12: [CLASER]\n");
    roster(&dir)
        .arg("sync-channels")
        .assert()
        .success()
        .stdout(predicate::str::contains("invite U1 to #CLASER"))
        .stdout(predicate::str::contains("invite U2").not())
        .stdout(predicate::str::contains("Run with --live"));
    invite.assert();
}

#[test]
fn sync_channels_cron_invites() {
    let mut server = mockito::Server::new();
    let _contacts = server
        .mock("GET", "/contacts")
        .match_query(Matcher::Any)
        .with_body(r#"[{"id": 1, "custom_fields": [{"id": "chat", "value": "U1"}], "groups": [{"id": 12}]}]"#)
        .create();
    let _members = server
        .mock("POST", "/conversations.members")
        .with_body(r#"{"ok": true, "members": []}"#)
        .create();
    let invite = server
        .mock("POST", "/conversations.invite")
        .match_header("authorization", "Bearer xoxp-test")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("channel".into(), "CLASER".into()),
            Matcher::UrlEncoded("users".into(), "U1".into()),
        ]))
        .with_body(r#"{"ok": true}"#)
        .expect(1)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        &server.url(),
        "channels:\n  by_group:\n    12: [CLASER]\npause:\n  default_secs: 0\n",
    );
    roster(&dir)
        .args(["sync-channels", "--live", "--cron"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 1 change(s) applied"));
    invite.assert();
}

// ---------------------------------------------------------------------------
// Other tasks
// ---------------------------------------------------------------------------

#[test]
fn membership_snapshot_rejects_bad_date() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "http://127.0.0.1:9", "");
    roster(&dir)
        .args(["membership-snapshot", "01/05/2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a YYYY-MM-DD date"));
}

#[test]
fn notify_document_dry_run_prints_message() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "http://127.0.0.1:9",
        "document:\n  base_url: https://docs.example.org\n",
    );
    roster(&dir)
        .arg("notify-document")
        .env("DOCUMENT_ID", "12")
        .env("DOCUMENT_FILE_NAME", "invoice.pdf")
        .env("DOCUMENT_CORRESPONDENT", "None")
        .assert()
        .success()
        .stdout(predicate::str::contains("would post"))
        .stdout(predicate::str::contains("(for UNKNOWN at"));
}

#[test]
fn export_events_from_directory() {
    let mut server = mockito::Server::new();
    let _events = server
        .mock("GET", "/events")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "30".into()),
            Matcher::UrlEncoded("public".into(), "true".into()),
        ]))
        .with_body(
            r#"[{"id": 7, "name": "Open Night", "start_at": "2024-05-01T18:00:00+0800",
                "end_at": "2024-05-01T21:00:00+0800", "body": "Come along",
                "location": "Workshop", "public_url": "https://x/7"}]"#,
        )
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url(), "");
    roster(&dir)
        .args(["export-events", "directory"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""summary": "Open Night""#))
        .stdout(predicate::str::contains(r#""id": 7"#));
}

#[test]
fn sync_tasks_without_tracker_section_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "http://127.0.0.1:9", "");
    roster(&dir)
        .arg("sync-tasks")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no 'tracker' section"));
}

// ---------------------------------------------------------------------------
// roster purge-channel / list-files / titles-file
// ---------------------------------------------------------------------------

#[test]
fn purge_channel_dry_run_deletes_nothing() {
    let mut server = mockito::Server::new();
    let _auth = server
        .mock("POST", "/auth.test")
        .with_body(r#"{"ok": true, "user": "admin", "user_id": "UADMIN"}"#)
        .create();
    let _users = server
        .mock("POST", "/users.list")
        .with_body(r#"{"ok": true, "members": [{"id": "U1", "name": "ada"}]}"#)
        .create();
    let _history = server
        .mock("POST", "/conversations.history")
        .match_body(Matcher::UrlEncoded("channel".into(), "CPURGE".into()))
        .with_body(
            r#"{"ok": true, "messages": [
            {"ts": "1700000000.000100", "user": "U1", "subtype": "channel_join", "text": "joined"},
            {"ts": "1600000000.000200", "user": "U1", "text": "old chatter"}
        ]}"#,
        )
        .create();
    let delete = server.mock("POST", "/chat.delete").expect(0).create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url(), "purge:\n  channel: CPURGE\n");
    roster(&dir)
        .arg("purge-channel")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 messages in channel CPURGE"))
        .stdout(predicate::str::contains(
            "delete message 1700000000.000100 by ada (U1) in #CPURGE",
        ))
        .stdout(predicate::str::contains("1 older message(s) to review"))
        .stdout(predicate::str::contains("\"old chatter\""));
    delete.assert();
}

#[test]
fn purge_channel_needs_a_channel() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "http://127.0.0.1:9", "");
    roster(&dir)
        .arg("purge-channel")
        .assert()
        .failure()
        .stderr(predicate::str::contains("purge.channel is not set"));
}

#[test]
fn list_files_prints_every_page() {
    let mut server = mockito::Server::new();
    let _first = server
        .mock("POST", "/files.list")
        .match_body("count=100")
        .with_body(r#"{"ok": true, "files": [{"id": "F1"}], "paging": {"page": 1, "pages": 2}}"#)
        .create();
    let _second = server
        .mock("POST", "/files.list")
        .match_body(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_body(r#"{"ok": true, "files": [{"id": "F2"}], "paging": {"page": 2, "pages": 2}}"#)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server.url(), "");
    roster(&dir)
        .arg("list-files")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id": "F1""#))
        .stdout(predicate::str::contains(r#""id": "F2""#));
}

#[test]
fn titles_file_read_then_set_dry_run() {
    let mut server = mockito::Server::new();
    let _contacts = server
        .mock("GET", "/contacts")
        .match_query(Matcher::Any)
        .with_body(
            r#"[
            {"id": 1, "first_name": "Ada", "custom_fields": [{"id": "chat", "value": "U1"}, {"id": "title", "value": "President"}]},
            {"id": 2, "first_name": "Bo", "custom_fields": [{"id": "chat", "value": "U2"}]}
        ]"#,
        )
        .create();
    let update = server.mock("PUT", "/contacts/1").match_query(Matcher::Any).expect(0).create();

    let dir = TempDir::new().unwrap();
    let yaml = format!(
        "directory:\n  base_url: {url}\n  token: dir-token\n  fields:\n    chat: chat\n    title: title\nchat:\n  base_url: {url}\n  bot_token: xoxb-test\n  notification_channel: CNOTIFY\n",
        url = server.url()
    );
    std::fs::write(dir.path().join("roster.yaml"), yaml).unwrap();

    roster(&dir)
        .args(["titles-file", "read"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 1 titled contact(s)"));
    let path = dir.path().join("titles.json");
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"title\": \"President\""));

    std::fs::write(&path, written.replace("President", "Patron")).unwrap();
    roster(&dir)
        .args(["titles-file", "set"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set title of contact 1 to \"Patron\""))
        .stdout(predicate::str::contains("Run with --live"));
    update.assert();
}
