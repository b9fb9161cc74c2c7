use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use torsift::config::COMPLETION_FILE_NAME;
use torsift::models::Torrent;

fn bstr(s: &str) -> String {
    format!("{}:{}", s.len(), s)
}

/// Two files, `a.bin` (5 bytes) and `sub/b.bin` (10 bytes), in 4-byte pieces
fn demo_torrent() -> Vec<u8> {
    let files: String = [(5, vec!["a.bin"]), (10, vec!["sub", "b.bin"])]
        .iter()
        .map(|(len, parts)| {
            let path: String = parts.iter().map(|p| bstr(p)).collect();
            format!("d6:lengthi{}e4:pathl{}ee", len, path)
        })
        .collect();
    let info = format!(
        "d5:filesl{}e4:name{}12:piece lengthi4e6:pieces0:e",
        files,
        bstr("demo")
    );
    format!(
        "d8:announce{}13:creation datei1700000000e4:info{}e",
        bstr("http://t/announce"),
        info
    )
    .into_bytes()
}

struct Fixture {
    dir: tempfile::TempDir,
    torrent: PathBuf,
    data: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let torrent = dir.path().join("demo.torrent");
    fs::write(&torrent, demo_torrent()).unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    Fixture { dir, torrent, data }
}

fn torsift(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_torsift"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let dir = tempfile::tempdir().unwrap();
    torsift(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Inspect and maintain selective BitTorrent downloads"));
}

#[test]
fn test_version() {
    let dir = tempfile::tempdir().unwrap();
    torsift(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("torsift 0.3.1"));
}

#[test]
fn test_layout() {
    let fx = fixture();
    torsift(fx.dir.path())
        .arg("layout")
        .arg(&fx.torrent)
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("pieces 0..2"))
        .stdout(predicate::str::contains("pieces 1..4"));
}

#[test]
fn test_layout_json_with_selection() {
    let fx = fixture();
    let output = torsift(fx.dir.path())
        .arg("layout")
        .arg(&fx.torrent)
        .args(["--json", "-s", "b.bin"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let layout: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(layout["piece_count"], 4);
    assert_eq!(layout["total_size"], 15);
    assert_eq!(layout["wanted_pieces"], 3);
    assert_eq!(layout["files"][0]["selected"], false);
    assert_eq!(layout["files"][1]["selected"], true);
    assert_eq!(layout["files"][1]["offset"], 5);
}

#[test]
fn test_layout_missing_torrent() {
    let dir = tempfile::tempdir().unwrap();
    torsift(dir.path())
        .arg("layout")
        .arg(dir.path().join("nope.torrent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read torrent file"));
}

#[test]
fn test_status_empty_download() {
    let fx = fixture();
    torsift(fx.dir.path())
        .arg("status")
        .arg(&fx.torrent)
        .arg("-d")
        .arg(&fx.data)
        .args(["--completion", "memory", "-t", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Download incomplete"));
}

#[test]
fn test_status_downgrades_stale_pieces() {
    let fx = fixture();
    let hash = Torrent::from_bytes(&demo_torrent()).unwrap().info_hash.to_hex();
    fs::write(
        fx.data.join(COMPLETION_FILE_NAME),
        format!(r#"{{"version":1,"torrents":{{"{}":[0,1,2,3]}}}}"#, hash),
    )
    .unwrap();
    fs::create_dir_all(fx.data.join("demo")).unwrap();
    fs::write(fx.data.join("demo/a.bin"), b"12345").unwrap();

    torsift(fx.dir.path())
        .arg("status")
        .arg(&fx.torrent)
        .arg("--dir")
        .arg(&fx.data)
        .assert()
        .success()
        .stdout(predicate::str::contains("Download incomplete"));

    let store: serde_json::Value =
        serde_json::from_slice(&fs::read(fx.data.join(COMPLETION_FILE_NAME)).unwrap()).unwrap();
    assert_eq!(store["torrents"][&hash], serde_json::json!([0]));
}

#[test]
fn test_status_all_complete() {
    let fx = fixture();
    let hash = Torrent::from_bytes(&demo_torrent()).unwrap().info_hash.to_hex();
    fs::write(
        fx.data.join(COMPLETION_FILE_NAME),
        format!(r#"{{"version":1,"torrents":{{"{}":[0,1,2,3]}}}}"#, hash),
    )
    .unwrap();
    fs::create_dir_all(fx.data.join("demo/sub")).unwrap();
    fs::write(fx.data.join("demo/a.bin"), b"12345").unwrap();
    fs::write(fx.data.join("demo/sub/b.bin"), b"0123456789").unwrap();

    torsift(fx.dir.path())
        .arg("status")
        .arg(&fx.torrent)
        .arg("-d")
        .arg(&fx.data)
        .assert()
        .success()
        .stdout(predicate::str::contains("All pieces complete"));
}

#[test]
fn test_flush_selected_only() {
    let fx = fixture();
    torsift(fx.dir.path())
        .arg("flush")
        .arg(&fx.torrent)
        .arg("-d")
        .arg(&fx.data)
        .args(["-s", "a.bin", "--completion", "memory"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Flushed 1 file(s)"))
        .stdout(predicate::str::contains("Skipped 1 unselected file(s)"));

    assert!(fx.data.join("demo/a.bin").exists());
    assert!(!fx.data.join("demo/sub/b.bin").exists());
}

#[test]
fn test_config_data_dir() {
    let fx = fixture();
    let config_dir = fx.dir.path().join("config/torsift");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        format!("data_dir = {:?}\ncompletion = \"memory\"\n", fx.data.display().to_string()),
    )
    .unwrap();

    torsift(fx.dir.path())
        .arg("flush")
        .arg(&fx.torrent)
        .assert()
        .success();

    assert!(fx.data.join("demo/a.bin").exists());
    assert!(fx.data.join("demo/sub/b.bin").exists());
    assert!(!fx.data.join(COMPLETION_FILE_NAME).exists());
}
