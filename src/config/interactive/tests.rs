use super::load_existing_config as load_existing_config_impl;
use tempfile::TempDir;

#[test]
fn load_existing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = load_existing_config_impl(temp_dir.path()).expect("config loaded successfully");
    assert!(!config.embedding.host.is_empty());
    assert!(config.embedding.port > 0);
    assert!(!config.chat.model.is_empty());
    assert_eq!(config.get_base_dir(), temp_dir.path());
}

#[test]
fn load_broken_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "[chat\nmodel = ")
        .expect("should write config");

    let config = load_existing_config_impl(temp_dir.path()).expect("defaults should be used");
    assert_eq!(config.memory.max_messages, 10);
    assert_eq!(config.get_base_dir(), temp_dir.path());
}
