use std::fs;

use tasktree::config::{Config, CONFIG_FILE};
use tasktree::error::Error;

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_from_dir(dir.path()).expect("defaults");

    assert_eq!(config.api.base_url, "http://127.0.0.1:8000/api");
    assert!(config.api.token.is_none());
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.output.indent, 2);
    assert!(config.output.show_counts);
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
[api]
base_url = "https://tasks.internal.example/api/v1"
timeout_secs = 10

[output]
indent = 3
"#;
    fs::write(dir.path().join(CONFIG_FILE), toml)?;

    let config = Config::load_from_dir(dir.path())?;

    assert_eq!(config.api.base_url, "https://tasks.internal.example/api/v1");
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.output.indent, 3);
    assert!(config.output.show_counts);

    Ok(())
}

#[test]
fn config_load_rejects_invalid_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(CONFIG_FILE), "this = [not valid").expect("write config");

    let result = Config::load_from_dir(dir.path());
    assert!(matches!(result, Err(Error::TomlParse(_))));
}

#[test]
fn config_load_rejects_out_of_range_indent() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(CONFIG_FILE), "[output]\nindent = 0").expect("write config");

    let result = Config::load_from_dir(dir.path());
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}
