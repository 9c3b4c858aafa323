use std::fs;

use cardledger_config::{Config, ConfigError, ConfigManager};
use tempfile::tempdir;

#[test]
fn default_config_is_valid() {
    let cfg = Config::default();

    assert_eq!(cfg.invoice_label_prefix, "Invoice");
    assert_eq!(cfg.backup_retention, 5);
    cfg.validate().expect("defaults validate");
}

#[test]
fn config_manager_persists_and_loads_config() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let cfg = Config {
        invoice_label_prefix: "Fatura".into(),
        data_root: Some(dir.path().join("elsewhere")),
        backup_retention: 3,
    };

    manager.save(&cfg).expect("save config");
    let loaded = manager.load().expect("load config");

    assert_eq!(loaded, cfg);
    assert!(!manager.config_path().with_extension("json.tmp").exists());
    assert_eq!(
        loaded.book_path(manager.base_dir()),
        dir.path().join("elsewhere").join("book.json")
    );
}

#[test]
fn missing_file_yields_defaults_and_book_under_base() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let loaded = manager.load().expect("load config");

    assert_eq!(loaded, Config::default());
    assert_eq!(
        loaded.book_path(manager.base_dir()),
        dir.path().join("books").join("book.json")
    );
}

#[test]
fn older_files_fill_new_fields_with_defaults() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    fs::write(
        manager.config_path(),
        r#"{ "locale": "en-GB", "backup_retention": 2 }"#,
    )
    .expect("write config");

    let loaded = manager.load().expect("load config");

    assert_eq!(loaded.backup_retention, 2);
    assert_eq!(loaded.invoice_label_prefix, "Invoice");
    assert_eq!(loaded.data_root, None);
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    let cfg = Config {
        backup_retention: 0,
        ..Config::default()
    };

    let err = manager.save(&cfg).unwrap_err();

    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(!manager.config_path().exists());
}
