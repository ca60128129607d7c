//! Command line tests against the built binary

use std::path::Path;

use assert_cmd::Command;
use lopdf::{dictionary, Document, Object};
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("clustercrop").unwrap()
}

/// Write a PDF with `count` Letter pages
fn write_letter_pdf(path: &Path, count: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..count)
        .map(|_| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.save(path).unwrap();
}

// --- Help / info ---

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("crop"))
        .stdout(predicate::str::contains("clusters"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn info_shows_config_locations() {
    cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config File Locations:"))
        .stdout(predicate::str::contains("clustercrop.toml"));
}

// --- Clusters ---

#[test]
fn clusters_text_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.pdf");
    write_letter_pdf(&input, 4);

    cmd()
        .arg("clusters")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("4 pages in 2 clusters"))
        .stdout(predicate::str::contains("Odd pages, 600x780"));
}

#[test]
fn clusters_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.pdf");
    write_letter_pdf(&input, 5);

    let output = cmd()
        .arg("clusters")
        .arg(&input)
        .args(["--json", "--exclude", "-1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let clusters = json.as_array().unwrap();
    assert_eq!(clusters.len(), 3);
    assert_eq!(clusters[0]["member_pages"], serde_json::json!([1, 3]));
    assert_eq!(clusters[1]["member_pages"], serde_json::json!([2, 4]));
    assert_eq!(clusters[2]["member_pages"], serde_json::json!([5]));
    assert_eq!(clusters[2]["excluded"], serde_json::json!(true));
}

// --- Crop ---

#[test]
fn crop_with_grid_writes_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.pdf");
    let output = dir.path().join("out.pdf");
    write_letter_pdf(&input, 2);

    cmd()
        .arg("crop")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--crop", "0.1/0.1/0.1/0.1:0/0/0.5/0,0.5/0/0/0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 pages"));

    let doc = Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[test]
fn crop_default_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    write_letter_pdf(&input, 1);

    cmd()
        .arg("crop")
        .arg(&input)
        .args(["--crop", "0/0/0/0", "--split", "2", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let doc = Document::load(dir.path().join("scan_cropped.pdf")).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn crop_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.pdf");
    let output = dir.path().join("out.pdf");
    write_letter_pdf(&input, 2);

    cmd()
        .arg("crop")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--crop", "0.1/0/0.1/0:0/0/0.1/0", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Crop Plan"))
        .stdout(predicate::str::contains("Output pages: 2"));

    assert!(!output.exists());
}

#[test]
fn crop_equalize_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.pdf");
    write_letter_pdf(&input, 2);

    cmd()
        .arg("crop")
        .arg(&input)
        .args(["--crop", "0.1/0.1/0.1/0.1:0.2/0.2/0.2/0.2", "--equalize", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "left=0.1000 bottom=0.1000 right=0.1000 top=0.1000",
        ))
        .stdout(predicate::str::contains(
            "left=0.2000 bottom=0.0000 right=0.0000 top=0.2000",
        ));
}

#[test]
fn crop_missing_input_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .arg("crop")
        .arg(dir.path().join("missing.pdf"))
        .args(["--crop", "0/0/0/0"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn crop_grid_cluster_mismatch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.pdf");
    write_letter_pdf(&input, 2);

    cmd()
        .arg("crop")
        .arg(&input)
        .args(["--crop", "0/0/0/0"])
        .assert()
        .code(1);
}

#[test]
fn crop_malformed_grid_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.pdf");
    write_letter_pdf(&input, 1);

    cmd()
        .arg("crop")
        .arg(&input)
        .args(["--crop", "0.1/0.1/0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn crop_invalid_exclude_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.pdf");
    write_letter_pdf(&input, 3);

    cmd()
        .arg("crop")
        .arg(&input)
        .args(["--crop", "0/0/0/0:0/0/0/0", "--exclude", "2-9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --exclude value"));
}

#[test]
fn crop_rejects_unknown_split_axis() {
    cmd()
        .args(["crop", "book.pdf", "--split-axis", "diagonal"])
        .assert()
        .code(2);
}

#[cfg(unix)]
#[test]
fn crop_interrupt_exits_cancelled() {
    use std::process::{Command as StdCommand, Stdio};
    use std::time::Duration;

    if which::which("pdftoppm").is_err() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("long.pdf");
    write_letter_pdf(&input, 400);

    // enough sample renders to still be rendering when the signal arrives
    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("clustercrop"))
        .arg("crop")
        .arg(&input)
        .args(["--max-samples", "200", "-q"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(700));

    let killed = StdCommand::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(5));
    assert!(!dir.path().join("long_cropped.pdf").exists());
}
