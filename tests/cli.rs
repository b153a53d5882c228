use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_config(dir: &Path, extra: &str) -> std::path::PathBuf {
    let config = dir.join("config.json");
    let body = format!(
        r#"{{
            "InFlatFile": {input:?},
            "InDir": {src:?},
            "InFileExt": ".txt",
            "OutDir": {out:?}{extra}
        }}"#,
        input = dir.join("dump.txt").display().to_string(),
        src = dir.join("src").display().to_string(),
        out = dir.join("out").display().to_string(),
    );
    fs::write(&config, body).unwrap();
    config
}

fn archive(dir: &Path, bucket: &str, id: u64, contents: &str) {
    let path = dir.join("src").join(bucket).join(format!("{id}.txt"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn migrates_and_prints_summary() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dump.txt"), "1|a.txt\n1|b.txt\n2|c.txt\n").unwrap();
    archive(dir.path(), "0/0", 1, "one");
    archive(dir.path(), "0/0", 2, "two");
    let config = write_config(dir.path(), "");

    Command::cargo_bin("bucket-migrate")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Lines processed: 3, skipped rows: 0, successfully copied: 2, duplicates skipped: 1, failed: 0",
        ));

    let out = dir.path().join("out");
    assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "one");
    assert_eq!(fs::read_to_string(out.join("duplicates.txt")).unwrap(), "1|b.txt\n");
    let log = fs::read_to_string(out.join("migrate.log")).unwrap();
    assert!(log.contains("Process stopped"));
}

#[test]
fn zips_output_when_configured() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dump.txt"), "1|a.txt\n").unwrap();
    archive(dir.path(), "0/0", 1, "one");
    let config = write_config(
        dir.path(),
        r#", "OutZipped": true, "OutZippedDeleteSource": true"#,
    );

    Command::cargo_bin("bucket-migrate")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    assert!(dir.path().join("out.zip").is_file());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_flag_runs_the_audit() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("src");
    fs::write(
        dir.path().join("audit.txt"),
        format!("1|{}|Claims\n", root.display()),
    )
    .unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            r#", "MissingIn": {:?}"#,
            dir.path().join("audit.txt").display().to_string()
        ),
    );

    Command::cargo_bin("bucket-migrate")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--missing")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing: 1"));

    let report = fs::read_to_string(dir.path().join("out/Claims_missing.txt")).unwrap();
    assert!(report.trim_end().ends_with("1.txt"));
}

#[test]
fn invalid_config_fails_before_any_output() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), r#", "FolderSize": 1"#);

    Command::cargo_bin("bucket-migrate")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("FolderSize"));

    assert!(!dir.path().join("out").exists());
}
