// Configuration management module
// Typed settings loaded from TOML plus the interactive `config` command

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    ChatConfig, Config, ConfigError, MemoryConfig, OllamaConfig, RetrievalConfig, RoutingConfig,
};
