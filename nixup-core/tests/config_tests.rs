//! Config load errors, atomic save, and init integration tests.
//! Storage: ~/.nixup/config.yaml

use assert_fs::prelude::*;
use nixup_core::{
    config::{self, CredentialSource},
    ConfigError, UpdateConfig,
};
use predicates::prelude::predicate;
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".nixup/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("config.yaml"), "must contain file path, got: {msg}");
}

#[test]
fn wrong_type_yaml_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".nixup/config.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn credential_sources_parse_from_yaml() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".nixup/config.yaml")
        .write_str(
            "repo_path: /home/me/nixos\n\
             generator:\n  credential:\n    kind: env\n    var: OPENROUTER_API_KEY\n",
        )
        .expect("write");

    let cfg = config::load_at(home.path()).expect("load");
    assert_eq!(
        cfg.generator.credential,
        CredentialSource::Env {
            var: "OPENROUTER_API_KEY".into()
        }
    );
    assert!(cfg.generator.enabled);
    assert_eq!(cfg.generator.max_tokens, 2000);
}

#[test]
fn generator_section_without_credential_has_none() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".nixup/config.yaml")
        .write_str("repo_path: /srv/nixos\ngenerator:\n  enabled: false\n")
        .expect("write");

    let cfg = config::load_at(home.path()).expect("load");
    assert!(!cfg.generator.enabled);
    assert_eq!(cfg.generator.credential, CredentialSource::None);
}

// ---------------------------------------------------------------------------
// 2. Save / init
// ---------------------------------------------------------------------------

#[test]
fn save_creates_dir_and_cleans_up_tmp() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg = UpdateConfig::default_for_home(home.path());

    config::save_at(home.path(), &cfg).expect("save");

    home.child(".nixup/config.yaml")
        .assert(predicate::path::exists());
    home.child(".nixup/config.yaml.tmp")
        .assert(predicate::path::missing());
    home.child(".nixup/config.yaml")
        .assert(predicate::str::contains("nixos-rebuild"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(home.path().join(".nixup"))
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o700);
    }
}

#[test]
fn init_refuses_existing_config_and_names_force() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg = UpdateConfig::default_for_home(home.path());
    config::init_at(home.path(), &cfg, false).expect("first init");

    let err = config::init_at(home.path(), &cfg, false).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists { .. }), "got: {err}");
    assert!(err.to_string().contains("--force"));
}

#[test]
fn forced_init_replaces_host() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut cfg = UpdateConfig::default_for_home(home.path());
    config::init_at(home.path(), &cfg, false).expect("first init");

    cfg.host = Some("laptop".into());
    config::init_at(home.path(), &cfg, true).expect("forced init");

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded.host.as_deref(), Some("laptop"));
    home.child(".nixup/config.yaml")
        .assert(predicate::str::contains("host: laptop"));
}
