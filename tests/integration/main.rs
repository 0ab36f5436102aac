//! Integration tests for pkgfeed

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A scratch feed: config file and package root inside one temp dir
    struct Feed {
        dir: TempDir,
    }

    impl Feed {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn with_config(toml: &str) -> Self {
            let feed = Self::new();
            std::fs::write(feed.config_path(), toml).unwrap();
            feed
        }

        fn root(&self) -> PathBuf {
            self.dir.path().join("packages")
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("pkgfeed");
            cmd.arg("--config")
                .arg(self.config_path())
                .arg("--root")
                .arg(self.root());
            cmd
        }

        /// Write an archive outside the feed, ready to push
        fn archive(&self, id: &str, version: &str) -> PathBuf {
            let path = self.dir.path().join(format!("{}.{}.nupkg", id, version));
            std::fs::write(&path, nupkg(id, version, "Integration test package")).unwrap();
            path
        }

        fn push(&self, id: &str, version: &str) {
            let archive = self.archive(id, version);
            self.cmd().arg("push").arg(&archive).assert().success();
        }
    }

    fn nupkg(id: &str, version: &str, description: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(format!("{}.nuspec", id), options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0"?><package><metadata><id>{}</id><version>{}</version><authors>tests</authors><description>{}</description></metadata></package>"#,
            id, version, description
        )
        .unwrap();
        zip.start_file(format!("lib/netstandard2.0/{}.dll", id), options)
            .unwrap();
        zip.write_all(b"MZ").unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn stored(root: &Path, name: &str) -> PathBuf {
        root.join(name)
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("pkgfeed")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Package Feed Cache Engine"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("pkgfeed")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgfeed"));
    }

    #[test]
    fn list_empty() {
        let feed = Feed::new();
        feed.cmd()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No packages"));
    }

    #[test]
    fn list_empty_json() {
        let feed = Feed::new();
        feed.cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("[]"));
    }

    #[test]
    fn push_then_list() {
        let feed = Feed::new();
        feed.push("Contoso.Utils", "1.0.0");
        feed.push("Contoso.Utils", "1.1.0");

        assert!(stored(&feed.root(), "contoso.utils.1.1.0.nupkg").exists());
        feed.cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Contoso.Utils 1.0.0"))
            .stdout(predicate::str::contains("Contoso.Utils 1.1.0"));
    }

    #[test]
    fn list_hides_prerelease_by_default() {
        let feed = Feed::new();
        feed.push("Foo", "1.0.0");
        feed.push("Foo", "2.0.0-beta");

        feed.cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Foo 2.0.0-beta").not());
        feed.cmd()
            .args(["list", "--prerelease", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Foo 2.0.0-beta"));
    }

    #[test]
    fn list_json_reports_latest_flags() {
        let feed = Feed::new();
        feed.push("Foo", "1.0.0");
        feed.push("Foo", "2.0.0-beta");

        let output = feed
            .cmd()
            .args(["list", "--prerelease", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);

        let release = rows.iter().find(|r| r["version"] == "1.0.0").unwrap();
        assert_eq!(release["metadata"]["isLatestVersion"], true);
        assert_eq!(release["metadata"]["isAbsoluteLatestVersion"], false);

        let beta = rows.iter().find(|r| r["version"] == "2.0.0-beta").unwrap();
        assert_eq!(beta["metadata"]["isLatestVersion"], false);
        assert_eq!(beta["metadata"]["isAbsoluteLatestVersion"], true);
    }

    #[test]
    fn push_existing_without_override_fails() {
        let feed = Feed::with_config(
            "[repository]\nallow_override_existing_package_on_push = false\n",
        );
        feed.push("Foo", "1.0.0");

        let archive = feed.archive("Foo", "1.0.0");
        feed.cmd()
            .arg("push")
            .arg(&archive)
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn push_corrupt_archive_fails() {
        let feed = Feed::new();
        let bad = feed.dir.path().join("bad.nupkg");
        std::fs::write(&bad, b"not a zip").unwrap();

        feed.cmd()
            .arg("push")
            .arg(&bad)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Corrupt package archive"));
        assert!(!feed.root().join("bad.nupkg").exists());
    }

    #[test]
    fn corrupt_archive_in_storage_fails_reads() {
        let feed = Feed::new();
        std::fs::create_dir_all(feed.root()).unwrap();
        std::fs::write(feed.root().join("broken.nupkg"), b"garbage").unwrap();

        feed.cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("broken.nupkg"));
    }

    #[test]
    fn search_matches_description() {
        let feed = Feed::new();
        feed.push("Alpha", "1.0.0");
        feed.push("Beta", "1.0.0");

        feed.cmd()
            .args(["search", "alpha", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Alpha 1.0.0"))
            .stdout(predicate::str::contains("Beta").not());
    }

    #[test]
    fn search_framework_filter() {
        let feed = Feed::with_config("[repository]\nenable_framework_filtering = true\n");
        feed.push("Foo", "1.0.0");

        feed.cmd()
            .args(["search", "--framework", "net8.0", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Foo 1.0.0"));
        feed.cmd()
            .args(["search", "--framework", "net45", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Foo").not());
    }

    #[test]
    fn show_prints_metadata() {
        let feed = Feed::new();
        feed.push("Foo", "1.0.0");

        feed.cmd()
            .args(["show", "foo", "1.0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Hash (SHA512)"))
            .stdout(predicate::str::contains("Latest: yes"));
    }

    #[test]
    fn relative_root_reports_absolute_paths() {
        let feed = Feed::new();
        feed.push("Foo", "1.0.0");

        let output = cargo_bin_cmd!("pkgfeed")
            .current_dir(feed.dir.path())
            .arg("--config")
            .arg(feed.config_path())
            .args(["--root", "packages", "show", "Foo", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let full_path = PathBuf::from(shown[0]["metadata"]["fullPath"].as_str().unwrap());
        assert!(full_path.is_absolute());
        assert!(full_path.ends_with("packages/foo.1.0.0.nupkg"));
    }

    #[test]
    fn show_missing_package() {
        let feed = Feed::new();
        feed.cmd()
            .args(["show", "Nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Package not found"));
    }

    #[test]
    fn delete_removes_file() {
        let feed = Feed::new();
        feed.push("Foo", "1.0.0");

        feed.cmd()
            .args(["delete", "FOO", "1.0.0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted"));
        assert!(!stored(&feed.root(), "foo.1.0.0.nupkg").exists());
    }

    #[test]
    fn delete_missing_is_reported() {
        let feed = Feed::new();
        feed.cmd()
            .args(["delete", "Foo", "9.9.9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Package not found"));
    }

    #[test]
    fn delete_with_delisting_keeps_file() {
        let feed = Feed::with_config("[repository]\nenable_delisting = true\n");
        feed.push("Foo", "1.0.0");

        feed.cmd()
            .args(["delete", "Foo", "1.0.0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Delisted"));
        assert!(stored(&feed.root(), "foo.1.0.0.nupkg").exists());

        feed.cmd()
            .args(["search", "foo", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Foo").not());
        feed.cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""listed": false"#));
    }

    #[test]
    fn config_path() {
        let feed = Feed::new();
        feed.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let feed = Feed::new();
        feed.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[repository]"));
    }

    #[test]
    fn config_init_writes_file() {
        let feed = Feed::new();
        feed.cmd().args(["config", "init"]).assert().success();
        let written = std::fs::read_to_string(feed.config_path()).unwrap();
        assert!(written.contains("enable_delisting = false"));

        feed.cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let feed = Feed::with_config("[repository\n");
        feed.cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn lenient_boolean_config() {
        let feed = Feed::with_config("[repository]\nenable_delisting = \"yes\"\n");
        feed.push("Foo", "1.0.0");
        feed.cmd()
            .args(["delete", "Foo", "1.0.0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Delisted"));
    }
}
