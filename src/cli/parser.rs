//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sleuth: step-bounded web research agent.
///
/// A language model decides, one step at a time, whether to search the web
/// or answer. Search results are fetched, extracted and fed back until it
/// answers or the step budget runs out.
#[derive(Parser, Debug)]
#[command(name = "sleuth")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Search provider: bocha, google or duckduckgo (aliases: keyed,
    /// custom, ddg, metasearch, 1, 2, 3).
    #[arg(long, global = true, env = "SLEUTH_SEARCH_PROVIDER")]
    pub provider: Option<String>,

    /// Proxy URL for metasearch traffic and proxied page fetches.
    #[arg(long, global = true, env = "SLEUTH_PROXY")]
    pub proxy: Option<String>,

    /// Completion model.
    #[arg(long, global = true, env = "SLEUTH_MODEL")]
    pub model: Option<String>,

    /// OpenAI-compatible completion endpoint.
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Maximum decision steps per run (1-50).
    #[arg(long, global = true, env = "SLEUTH_MAX_STEPS")]
    pub max_steps: Option<usize>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a question until the model answers or the step budget runs out.
    ///
    /// Progress events are printed as they happen.
    #[command(after_help = r#"Examples:
  sleuth ask "What is the capital of France?"
  sleuth ask --provider google "latest stable Rust release"
  sleuth --format ndjson ask "who won the 2022 world cup" | jq -c .
  sleuth --proxy socks5h://127.0.0.1:1080 ask --max-steps 4 "rustls vs openssl"
"#)]
    Ask {
        /// The question (words are joined with spaces).
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Directory containing a `system.md` prompt template.
        #[arg(long, env = "SLEUTH_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,

        /// Extra completion attempts after an unparseable decision.
        #[arg(long)]
        parse_retries: Option<u32>,
    },

    /// Run one search through the configured provider and print the report.
    #[command(after_help = r#"Examples:
  sleuth search "capital of France"
  sleuth --provider bocha search "rust async runtimes"
"#)]
    Search {
        /// Search query (words are joined with spaces).
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Extract the readable text of one page.
    ///
    /// Uses the proxied full fetch when `--proxy` is set, the direct
    /// lightweight fetch otherwise.
    Extract {
        /// Page URL.
        url: String,
    },

    /// Write the default system prompt template for customization.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  sleuth init-prompts                 # Write to ~/.config/sleuth/prompts/
  sleuth init-prompts ./my-prompts    # Write to a custom directory
"#)]
    InitPrompts {
        /// Target directory. Defaults to `~/.config/sleuth/prompts/`.
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::try_parse_from(["sleuth", "ask", "capital", "of", "France"])
            .unwrap_or_else(|e| unreachable!("{e}"));
        match cli.command {
            Commands::Ask { question, .. } => assert_eq!(question.join(" "), "capital of France"),
            other => unreachable!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sleuth",
            "search",
            "q",
            "--provider",
            "ddg",
            "--max-steps",
            "3",
        ])
        .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(cli.provider.as_deref(), Some("ddg"));
        assert_eq!(cli.max_steps, Some(3));
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["sleuth", "ask"]).is_err());
    }
}
