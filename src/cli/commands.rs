//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Async work runs on a
//! tokio runtime created per command as the sync/async bridge.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::prompt::PromptSet;
use crate::agent::{
    AgentEvent, LlmProvider, ResearchAgent, RunOutcome, RunStatus, create_provider,
};
use crate::cli::output::{OutputFormat, format_event_text, format_outcome_text};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};
use crate::search::{
    ContentExtractor, FetchRoute, PageExtractor, SearchConfig, SearchDispatcher, SearchTool,
};

/// Executes the CLI command.
///
/// `ask` streams its events to stdout as they arrive; every command
/// returns the remaining output for the caller to print.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format: OutputFormat = cli.format.parse()?;

    match &cli.command {
        Commands::Ask {
            question,
            prompt_dir,
            parse_retries,
        } => {
            let mut stdout = io::stdout().lock();
            cmd_ask(
                cli,
                &question.join(" "),
                prompt_dir.as_deref(),
                *parse_retries,
                format,
                &mut stdout,
            )
        }
        Commands::Search { query } => cmd_search(cli, &query.join(" "), format),
        Commands::Extract { url } => cmd_extract(cli, url, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Search configuration from the environment with CLI overrides applied.
fn search_config(cli: &Cli) -> SearchConfig {
    let mut config = SearchConfig::default().from_env();
    if let Some(provider) = &cli.provider {
        config.provider.clone_from(provider);
    }
    if let Some(proxy) = &cli.proxy {
        config.proxy = Some(proxy.clone()).filter(|p| !p.is_empty());
    }
    config
}

/// Agent configuration: CLI values first, then environment, then defaults.
fn agent_config(
    cli: &Cli,
    prompt_dir: Option<&Path>,
    parse_retries: Option<u32>,
) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder().search(search_config(cli));
    if let Some(model) = &cli.model {
        builder = builder.model(model);
    }
    if let Some(url) = &cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(n) = cli.max_steps {
        builder = builder.max_steps(n);
    }
    if let Some(n) = parse_retries {
        builder = builder.parse_retries(n);
    }
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    builder.from_env().build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

fn write_event(out: &mut dyn Write, event: &AgentEvent, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => write!(out, "{}", format_event_text(event))?,
        OutputFormat::Ndjson => writeln!(out, "{}", format.to_json(event)?)?,
        OutputFormat::Json => return Ok(()),
    }
    out.flush()?;
    Ok(())
}

/// Runs the research loop, streaming events to `out`.
///
/// Ctrl-C drops the event receiver, which cancels the run at its next
/// emission.
fn cmd_ask(
    cli: &Cli,
    question: &str,
    prompt_dir: Option<&Path>,
    parse_retries: Option<u32>,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<String> {
    let config = agent_config(cli, prompt_dir, parse_retries)?;
    let max_steps = config.max_steps;

    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?);
    let search: Arc<dyn SearchTool> = Arc::new(SearchDispatcher::new(config.search.clone()));
    let agent = Arc::new(ResearchAgent::new(provider, search, config));

    let rt = runtime()?;
    let (outcome, events) = rt.block_on(async {
        let (handle, mut rx) = agent.spawn(question);
        let mut events = Vec::new();

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(event) => {
                        write_event(out, &event, format)?;
                        if format == OutputFormat::Json {
                            events.push(event);
                        }
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, cancelling run");
                    break;
                }
            }
        }
        drop(rx);

        let outcome = handle
            .await
            .map_err(|e| CommandError::ExecutionFailed(format!("Research task failed: {e}")))?;
        Ok::<(RunOutcome, Vec<AgentEvent>), crate::error::Error>((outcome, events))
    })?;

    if outcome.status == RunStatus::Failed && format == OutputFormat::Text {
        return Err(CommandError::ExecutionFailed(format!(
            "research run failed after {} step(s)",
            outcome.steps
        ))
        .into());
    }

    match format {
        OutputFormat::Text => Ok(format_outcome_text(&outcome, max_steps)),
        OutputFormat::Ndjson => {
            let summary = serde_json::json!({
                "type": "run_outcome",
                "status": outcome.status,
                "steps": outcome.steps,
                "searches": outcome.searches,
                "usage": outcome.usage,
            });
            Ok(format!("{}\n", format.to_json(&summary)?))
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "question": question,
                "outcome": outcome,
                "events": events,
            });
            Ok(format!("{}\n", format.to_json(&json)?))
        }
    }
}

fn cmd_search(cli: &Cli, query: &str, format: OutputFormat) -> Result<String> {
    let config = search_config(cli);
    let provider = config.provider.clone();
    let dispatcher = SearchDispatcher::new(config);

    let rt = runtime()?;
    let report = rt.block_on(dispatcher.dispatch(query, &provider));

    match format {
        OutputFormat::Text => Ok(format!("{report}\n")),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "query": query,
                "provider": dispatcher.provider_name(),
                "report": report,
            });
            Ok(format!("{}\n", format.to_json(&json)?))
        }
    }
}

fn cmd_extract(cli: &Cli, url: &str, format: OutputFormat) -> Result<String> {
    let config = search_config(cli);
    let (route, extractor) = if config.proxy.is_some() {
        (FetchRoute::Proxy, PageExtractor::proxied(&config)?)
    } else {
        (FetchRoute::Direct, PageExtractor::new(&config)?)
    };

    let rt = runtime()?;
    let text = rt.block_on(extractor.extract(url, route));

    match format {
        OutputFormat::Text if text.is_empty() => {
            Ok(format!("No text could be extracted from {url}\n"))
        }
        OutputFormat::Text => Ok(format!("{text}\n")),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "url": url,
                "route": if route == FetchRoute::Proxy { "proxy" } else { "direct" },
                "chars": text.chars().count(),
                "text": text,
            });
            Ok(format!("{}\n", format.to_json(&json)?))
        }
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "Prompt template already exists in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    output.push_str("  ");
                    output.push_str(
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown"),
                    );
                    output.push('\n');
                }
                output.push_str(
                    "\nEdit system.md to customize the research prompt ({provider} and {now} are filled in per run).\n",
                );
                Ok(output)
            }
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format!("{}\n", format.to_json(&json)?))
        }
    }
}
