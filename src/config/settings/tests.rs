use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.chat.model, "gemini-2.0-flash-exp");
    assert!((config.chat.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(config.chat.api_key_env, "GEMINI_KEY");
    assert_eq!(config.embedding.host, "localhost");
    assert_eq!(config.embedding.port, 11434);
    assert_eq!(config.chunking.max_segment_size, 300);
    assert_eq!(config.chunking.overlap, 50);
    assert_eq!(config.retrieval.max_results, 3);
    assert!((config.retrieval.min_score - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.routing.policy, RoutingPolicyKind::LlmClassifier);
    assert_eq!(config.routing.ambiguous, AmbiguousPolicy::Retrieve);
    assert_eq!(config.memory.max_messages, 10);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.embedding.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chat.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chat.temperature = 2.5;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTemperature(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.min_score = 1.5;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidMinScore(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.max_results = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.memory.max_messages = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidMemorySize(0))
    ));

    let mut invalid_config = config;
    invalid_config.routing.domain = "  ".to_string();
    assert!(invalid_config.validate().is_err());
}

#[test]
fn overlap_must_be_smaller_than_segment_size() {
    let mut config = Config::default();
    config.chunking.max_segment_size = 100;
    config.chunking.overlap = 100;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(100, 100))
    ));

    config.chunking.overlap = 99;
    assert!(config.validate().is_ok());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn chat_base_url_gets_trailing_slash() {
    let mut config = Config::default();
    config.chat.base_url = "https://example.com/v1beta".to_string();

    let url = config.chat.base_url().expect("should parse base url");
    assert_eq!(url.as_str(), "https://example.com/v1beta/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn api_key_is_never_serialized() {
    let mut config = Config::default();
    config.chat.api_key = Some("super-secret".to_string());

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    assert!(!toml_str.contains("super-secret"));
    assert!(!format!("{:?}", config).contains("super-secret"));
}

#[test]
fn routing_policy_from_toml() {
    let toml_str = r#"
        [routing]
        policy = "always"
        ambiguous = "skip"
    "#;
    let config: Config = toml::from_str(toml_str).expect("should parse toml correctly");
    assert_eq!(config.routing.policy, RoutingPolicyKind::Always);
    assert_eq!(config.routing.ambiguous, AmbiguousPolicy::Skip);
    assert_eq!(config.routing.domain, "l'intelligence artificielle");
}

#[test]
fn resolve_api_key_reads_configured_variable() {
    let config = Config::default()
        .resolve_api_key(|name| {
            assert_eq!(name, "GEMINI_KEY");
            Some("abc123".to_string())
        })
        .expect("key should resolve");

    assert_eq!(config.chat.api_key.as_deref(), Some("abc123"));
}

#[test]
fn missing_api_key_is_fatal() {
    let result = Config::default().resolve_api_key(|_| None);
    assert!(matches!(
        result,
        Err(AssistantError::MissingCredential { ref env_var }) if env_var == "GEMINI_KEY"
    ));

    let result = Config::default().resolve_api_key(|_| Some("   ".to_string()));
    assert!(result.is_err());
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing file should yield defaults");
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.chat, ChatConfig::default());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config.memory.max_messages = 4;
    config.routing.policy = RoutingPolicyKind::Never;

    config.save().expect("config should save");
    let loaded = Config::load(temp_dir.path().join("nested")).expect("config should load");

    assert_eq!(loaded.memory.max_messages, 4);
    assert_eq!(loaded.routing.policy, RoutingPolicyKind::Never);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[chunking]\nmax_segment_size = 10\noverlap = 20\n",
    )
    .expect("should write config");

    assert!(matches!(
        Config::load(temp_dir.path()),
        Err(ConfigError::OverlapTooLarge(20, 10))
    ));
}

#[test]
fn load_errors_are_configuration_errors() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[memory]\nmax_messages = 0\n",
    )
    .expect("should write config");

    let error = Config::load(temp_dir.path()).map_err(AssistantError::from);
    assert!(matches!(error, Err(AssistantError::Config(_))));
    assert!(!error.is_err_and(|e| e.is_recoverable()));

    fs::write(temp_dir.path().join("config.toml"), "[memory\n").expect("should write config");
    assert!(matches!(
        Config::load(temp_dir.path()),
        Err(ConfigError::TomlParse(_))
    ));
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("nomic-embed-text".to_string()).is_ok());
    assert!(config.set_embedding_dimension(768).is_ok());

    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_embedding_dimension(1).is_err());
}
