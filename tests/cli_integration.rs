use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn shelf(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("readshelf").unwrap();
    cmd.env("READSHELF_DATA_DIR", dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.join("readshelf.toml"));
    cmd
}

fn write_pdf(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"%PDF-1.7 test").unwrap();
    path
}

#[test]
fn test_empty_shelf() {
    let temp = TempDir::new().unwrap();
    shelf(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No folders yet."));
}

#[test]
fn test_folder_and_books() {
    let temp = TempDir::new().unwrap();
    let data = temp.path();

    shelf(data)
        .args(["folder", "add", "Papers", "--description", "to read"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created folder Papers"));

    let pdf = write_pdf(data, "attention_is_all-you_need.pdf");
    shelf(data)
        .args(["book", "add", "papers"])
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added attention is all - you need"));

    shelf(data)
        .args(["books", "Papers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("attention is all - you need"))
        .stdout(predicate::str::contains("new"));

    shelf(data)
        .args(["ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Papers"))
        .stdout(predicate::str::contains("1 book"));
}

#[test]
fn test_rejects_non_pdf() {
    let temp = TempDir::new().unwrap();
    let data = temp.path();
    let notes = data.join("notes.txt");
    fs::write(&notes, "plain").unwrap();

    shelf(data).args(["folder", "add", "Papers"]).assert().success();
    shelf(data)
        .args(["book", "add", "Papers", "--title", "Notes"])
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("not a PDF"));

    // In a batch the non-PDF is skipped
    let pdf = write_pdf(data, "ok.pdf");
    shelf(data)
        .args(["book", "add", "Papers"])
        .arg(&notes)
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped notes.txt"))
        .stdout(predicate::str::contains("Uploaded 1 of 2 files"));
}

#[test]
fn test_unknown_selector_fails() {
    let temp = TempDir::new().unwrap();
    shelf(temp.path())
        .args(["books", "Nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No folder matches 'Nowhere'"));
}

#[test]
fn test_folder_order_persists() {
    let temp = TempDir::new().unwrap();
    let data = temp.path();

    shelf(data).args(["folder", "add", "First"]).assert().success();
    shelf(data).args(["folder", "add", "Second"]).assert().success();
    // New folders go on top, so Second is listed first
    shelf(data)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)1\. Second.*2\. First").unwrap());

    shelf(data)
        .args(["folder", "mv", "First", "1"])
        .assert()
        .success();
    shelf(data)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)1\. First.*2\. Second").unwrap());

    shelf(data)
        .args(["folder", "mv", "First", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to move"));
}

#[test]
fn test_delete_finalizes_on_exit() {
    let temp = TempDir::new().unwrap();
    let data = temp.path();

    shelf(data).args(["folder", "add", "Papers"]).assert().success();
    let pdf = write_pdf(data, "paper.pdf");
    shelf(data)
        .args(["book", "add", "Papers"])
        .arg(&pdf)
        .assert()
        .success();
    assert_eq!(fs::read_dir(data.join("blobs")).unwrap().count(), 1);

    shelf(data)
        .args(["folder", "rm", "Papers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted folder Papers (1 books)"));

    assert_eq!(fs::read_dir(data.join("blobs")).unwrap().count(), 0);
    shelf(data)
        .assert()
        .success()
        .stdout(predicate::str::contains("No folders yet."));
}

#[test]
fn test_category_removal_keeps_folders() {
    let temp = TempDir::new().unwrap();
    let data = temp.path();

    shelf(data).args(["category", "add", "Work"]).assert().success();
    shelf(data)
        .args(["folder", "add", "Reports", "--category", "Work"])
        .assert()
        .success();
    shelf(data)
        .assert()
        .success()
        .stdout(predicate::str::contains("Work"))
        .stdout(predicate::str::contains("Reports"));

    shelf(data)
        .args(["category", "rm", "Work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted category Work"));
    shelf(data)
        .assert()
        .success()
        .stdout(predicate::str::contains("Reports"))
        .stdout(predicate::str::contains("Work").not());
}

#[test]
fn test_reading_progress() {
    let temp = TempDir::new().unwrap();
    let data = temp.path();

    shelf(data).args(["folder", "add", "Papers"]).assert().success();
    let pdf = write_pdf(data, "thesis.pdf");
    shelf(data)
        .args(["book", "add", "Papers"])
        .arg(&pdf)
        .assert()
        .success();

    shelf(data)
        .args(["book", "progress", "thesis", "25", "--of", "100"])
        .assert()
        .success();
    shelf(data)
        .args(["books", "Papers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("25%"));

    shelf(data).args(["book", "read", "thesis"]).assert().success();
    shelf(data)
        .args(["stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("100%"));
}
