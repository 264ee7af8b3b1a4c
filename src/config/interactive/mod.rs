#[cfg(test)]
mod tests;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{ChatConfig, Config, ConfigError, OllamaConfig, RoutingConfig};
use crate::embeddings::OllamaClient;
use crate::http::HttpClient;
use crate::routing::{AmbiguousPolicy, RoutingPolicyKind};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 RAG Assistant Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Language Model").bold().yellow());
    eprintln!("Configure the chat model that answers questions.");
    eprintln!();
    configure_chat(&mut config.chat)?;

    eprintln!();
    eprintln!("{}", style("Embeddings").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();
    configure_ollama(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Query Routing").bold().yellow());
    eprintln!();
    configure_routing(&mut config.routing)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.embedding) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before chatting.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Language Model:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.chat.base_url).cyan());
    eprintln!("  Model: {}", style(&config.chat.model).cyan());
    eprintln!("  Temperature: {}", style(config.chat.temperature).cyan());
    eprintln!("  Timeout: {}s", style(config.chat.timeout_seconds).cyan());
    eprintln!("  API key variable: {}", style(&config.chat.api_key_env).cyan());
    let key_state = if std::env::var(&config.chat.api_key_env).is_ok() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!("  API key: {}", key_state);

    eprintln!();
    eprintln!("{}", style("Embeddings:").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.embedding.embedding_dimension).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!(
        "  Segments: {} chars, {} overlap",
        style(config.chunking.max_segment_size).cyan(),
        style(config.chunking.overlap).cyan()
    );
    eprintln!(
        "  Results: top {} with score >= {}",
        style(config.retrieval.max_results).cyan(),
        style(config.retrieval.min_score).cyan()
    );
    eprintln!("  Routing: {}", style(config.routing.policy).cyan());
    eprintln!("  Domain: {}", style(&config.routing.domain).cyan());
    eprintln!("  Memory: {} messages", style(config.memory.max_messages).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_chat(chat: &mut ChatConfig) -> Result<()> {
    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(chat.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let temperature: f32 = Input::new()
        .with_prompt("Temperature")
        .default(chat.temperature)
        .validate_with(|input: &f32| -> Result<(), ConfigError> {
            if (0.0..=2.0).contains(input) {
                Ok(())
            } else {
                Err(ConfigError::InvalidTemperature(*input))
            }
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(chat.api_key_env.clone())
        .interact_text()?;

    chat.model = model;
    chat.temperature = temperature;
    chat.api_key_env = api_key_env;
    chat.validate()?;

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(ollama.embedding_dimension)
        .interact_text()?;

    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_routing(routing: &mut RoutingConfig) -> Result<()> {
    let policies = [
        RoutingPolicyKind::LlmClassifier,
        RoutingPolicyKind::Always,
        RoutingPolicyKind::Never,
    ];
    let default_index = policies
        .iter()
        .position(|p| *p == routing.policy)
        .unwrap_or(0);

    let policy_index = Select::new()
        .with_prompt("When should documents be consulted?")
        .default(default_index)
        .items(&policies)
        .interact()?;
    routing.policy = policies.get(policy_index).copied().unwrap_or_default();

    if routing.policy == RoutingPolicyKind::LlmClassifier {
        routing.domain = Input::new()
            .with_prompt("Subject covered by the documents")
            .default(routing.domain.clone())
            .interact_text()?;

        let retrieve_on_doubt = Confirm::new()
            .with_prompt("Consult documents when the classifier is unsure?")
            .default(routing.ambiguous == AmbiguousPolicy::Retrieve)
            .interact()?;
        routing.ambiguous = if retrieve_on_doubt {
            AmbiguousPolicy::Retrieve
        } else {
            AmbiguousPolicy::Skip
        };
    }

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    OllamaClient::new(ollama)
        .map(|client| client.with_http_client(HttpClient::new(Duration::from_secs(5), 1)))
        .and_then(|client| client.list_models())
        .is_ok()
}
