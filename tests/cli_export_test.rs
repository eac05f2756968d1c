//! Integration tests for `td export` and `td settings`.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;
use std::io::Cursor;
use testdoc::export::ArchiveFormat;
use testdoc::export::archive::list_entries;

fn zip_entry_names(archive: Vec<u8>) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn test_export_single_test_pdf() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[("user", "admin")]);
    let record = env.json(&[
        "test", "create", &project, "Login", "--env", "QA", "--related", "https://jira/browse/PRJ-1",
    ]);
    let id = record["id"].as_str().unwrap();

    let exported = env.json(&["export", "test", &project, id]);
    assert!(exported["path"].as_str().unwrap().ends_with("Login___PRJ_1.pdf"));
    let path = env.work_path().join("Login___PRJ_1.pdf");

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[test]
fn test_export_project_archive() {
    let env = TestEnv::init();
    let project = env.seed_project("Banca Móvil", "QA", &[]);
    env.td()
        .args(["test", "create", &project, "Alta cliente", "--env", "QA"])
        .assert()
        .success();
    env.td()
        .args(["test", "create", &project, "Login", "--env", "QA"])
        .assert()
        .success();

    let out = env.work_path().join("out");
    let report = env.json(&[
        "export", "project", &project, "-o", out.to_str().unwrap(), "--format", "html",
    ]);
    assert_eq!(report["failed"].as_array().unwrap().len(), 0);
    assert_eq!(report["format"], "zip");

    let archive = out.join("Banca_M_vil-pruebas.zip");
    assert!(archive.exists());
    let names = zip_entry_names(fs::read(&archive).unwrap());
    assert_eq!(names, vec!["Login.html", "Alta_cliente.html"]);

    // Tar remains available per export
    env.json(&["export", "project", &project, "-o", out.to_str().unwrap(), "--archive", "tar-gz"]);
    let bytes = fs::read(out.join("Banca_M_vil-pruebas.tar.gz")).unwrap();
    assert_eq!(
        list_entries(&bytes, ArchiveFormat::TarGz).unwrap(),
        vec!["Login.pdf", "Alta_cliente.pdf"]
    );
}

#[test]
fn test_export_project_zstd_from_preference() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[]);
    env.td()
        .args(["test", "create", &project, "Login", "--env", "QA"])
        .assert()
        .success();
    env.td()
        .args(["config", "pref", "archive-format", "tar-zst"])
        .assert()
        .success();

    let report = env.json(&["export", "project", &project]);
    assert_eq!(report["format"], "tar-zst");
    assert!(env.work_path().join("Shop-pruebas.tar.zst").exists());
}

#[test]
fn test_export_empty_project_fails() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[]);
    env.td()
        .args(["export", "project", &project])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no tests to export"));
}

#[test]
fn test_logo_is_used_in_pdf() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[]);
    let record = env.json(&["test", "create", &project, "Login", "--env", "QA"]);
    let id = record["id"].as_str().unwrap();

    // Smallest JPEG header the renderer can size: SOF0 for a 2x1 RGB image
    let mut jpeg = vec![0xff, 0xd8];
    jpeg.extend_from_slice(&[0xff, 0xc0, 0x00, 0x11, 0x08, 0x00, 0x01, 0x00, 0x02, 0x03]);
    jpeg.extend_from_slice(&[0u8; 9]);
    jpeg.extend_from_slice(&[0xff, 0xd9]);
    let logo = env.work_path().join("logo.jpg");
    fs::write(&logo, &jpeg).unwrap();

    let settings = env.json(&["settings", "logo", "set", logo.to_str().unwrap()]);
    assert_eq!(settings["logo"], true);
    assert_eq!(settings["logo_mime"], "image/jpeg");

    env.json(&["export", "test", &project, id]);
    let pdf = fs::read(env.work_path().join("Login.pdf")).unwrap();
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("/Filter /DCTDecode"));

    env.td().args(["settings", "logo", "clear"]).assert().success();
    let settings = env.json(&["settings", "show"]);
    assert_eq!(settings["logo"], false);
}

#[test]
fn test_unknown_formats_rejected() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[]);
    env.td()
        .args(["test", "create", &project, "Login", "--env", "QA"])
        .assert()
        .success();
    env.td()
        .args(["export", "project", &project, "--format", "docx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown document format"));
    env.td()
        .args(["export", "project", &project, "--archive", "rar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown archive format"));
}
