use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{create_dir_all, write};
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Writes a config whose output directory lives inside `root`.
fn write_config(root: &Path) -> std::path::PathBuf {
    let config = root.join("config.yaml");
    write(
        &config,
        format!(
            "output_dir: {}\ncitation:\n  template: \"{{authors}}. {{title}}. {{doi}}\"\n",
            root.join("output").display()
        ),
    )
    .expect("Writing temp config failed");
    config
}

fn write_manifest(root: &Path) -> std::path::PathBuf {
    let manifest = root.join("articles.yaml");
    write(
        &manifest,
        "- slug: alpha\n  title: Alpha\n  summary: First\n  source_path: content/alpha.rst\n\
         - slug: beta\n  title: Beta\n  summary: Second\n  source_path: content/beta.rst\n\
         - slug: gamma\n  title: Gamma\n  summary: Third\n  source_path: content/gamma.rst\n\
         - slug: delta\n  title: Delta\n  summary: Fourth\n  source_path: content/delta.rst\n",
    )
    .expect("Writing temp manifest failed");
    manifest
}

fn workspace() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());
    let manifest = write_manifest(dir.path());
    (dir, config, manifest)
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("figshare-publish")
        .expect("Binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("publish").and(predicate::str::contains("status")));
}

#[test]
fn publish_with_missing_config_fails() {
    let (dir, _config, manifest) = workspace();
    Command::cargo_bin("figshare-publish")
        .unwrap()
        .arg("publish")
        .arg("--config")
        .arg(dir.path().join("nope.yaml"))
        .arg("--articles")
        .arg(manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn publish_without_credentials_fails_before_any_call() {
    let (dir, config, manifest) = workspace();
    Command::cargo_bin("figshare-publish")
        .unwrap()
        .current_dir(dir.path())
        .arg("publish")
        .arg("--config")
        .arg(config)
        .arg("--articles")
        .arg(manifest)
        .env_remove("FIGSHARE_CLIENT_KEY")
        .env_remove("FIGSHARE_CLIENT_SECRET")
        .env_remove("FIGSHARE_TOKEN_KEY")
        .env_remove("FIGSHARE_TOKEN_SECRET")
        .assert()
        .failure()
        .stderr(predicate::str::contains("FIGSHARE_CLIENT_KEY"));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn status_reports_each_article_from_its_sidecar() {
    let (dir, config, manifest) = workspace();
    let pdf_dir = dir.path().join("output").join("pdf");
    create_dir_all(&pdf_dir).unwrap();
    write(
        pdf_dir.join("beta-figshare.json"),
        r#"{"article_id": 41, "persistent_id": "10.6084/m9.figshare.41", "pending_upload": true}"#,
    )
    .unwrap();
    write(
        pdf_dir.join("gamma-figshare.json"),
        r#"{"article_id": 42, "doi": "10.6084/m9.figshare.42"}"#,
    )
    .unwrap();
    write(
        pdf_dir.join("delta-figshare.json"),
        r#"{"article_id": 43, "persistent_id": "10.6084/m9.figshare.43", "pending_public": true}"#,
    )
    .unwrap();

    Command::cargo_bin("figshare-publish")
        .unwrap()
        .arg("status")
        .arg("--config")
        .arg(config)
        .arg("--articles")
        .arg(manifest)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("alpha: unpublished")
                .and(predicate::str::contains("beta: pending upload (article 41)"))
                .and(predicate::str::contains(
                    "gamma: published 10.6084/m9.figshare.42 (article 42)",
                ))
                .and(predicate::str::contains(
                    "delta: uploaded 10.6084/m9.figshare.43, not yet public (article 43)",
                )),
        );
}

#[test]
fn status_reports_corrupt_sidecar_without_failing() {
    let (dir, config, manifest) = workspace();
    let pdf_dir = dir.path().join("output").join("pdf");
    create_dir_all(&pdf_dir).unwrap();
    write(pdf_dir.join("alpha-figshare.json"), "{ truncated").unwrap();

    Command::cargo_bin("figshare-publish")
        .unwrap()
        .arg("status")
        .arg("--config")
        .arg(config)
        .arg("--articles")
        .arg(manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha: error:"));
}
