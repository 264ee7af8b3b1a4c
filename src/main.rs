use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rag_assistant::Result;
use rag_assistant::commands::start_chat;
use rag_assistant::config::{Config, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "rag-assistant")]
#[command(about = "A conversational assistant answering questions from your own documents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the language model, embeddings and routing
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index documents and start a conversation
    Chat {
        /// Text, Markdown or HTML files to answer from
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Chat { documents } => {
            start_chat(&config_dir, &documents)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn chat_command_with_documents() {
        let cli = Cli::try_parse_from(["rag-assistant", "chat", "cours.pdf.txt", "notes.md"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chat { documents } = parsed.command {
                assert_eq!(
                    documents,
                    vec![PathBuf::from("cours.pdf.txt"), PathBuf::from("notes.md")]
                );
            }
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn chat_requires_a_document() {
        let cli = Cli::try_parse_from(["rag-assistant", "chat"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn config_dir_override() {
        let cli = Cli::try_parse_from([
            "rag-assistant",
            "chat",
            "doc.txt",
            "--config-dir",
            "/tmp/rag",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/rag")));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["rag-assistant", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["rag-assistant", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["rag-assistant", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
