mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use structurify_core::{DiagramError, DiagramKind, DiagramRequest, build_diagram};
use structurify_llm::prompt::system_prompt;
use structurify_llm::{GatewayOptions, LlmClient, generate_diagram};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// ── CLI ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "structurify", about = "Turn source code into Mermaid diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the model to diagram a code snippet
    Generate {
        /// flowchart, sequence, class or er
        #[arg(long)]
        kind: DiagramKind,

        /// Source file (reads stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Write the diagram here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Replace the built-in instruction template
        #[arg(long)]
        prompt: Option<PathBuf>,

        /// Override model name
        #[arg(long)]
        model: Option<String>,

        /// Path to config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Compile an existing JSON plan without calling the model
    Compile {
        #[arg(long)]
        kind: DiagramKind,

        /// Plan file (reads stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print the built-in instruction template for a diagram kind
    Prompt {
        #[arg(long)]
        kind: DiagramKind,
    },
}

// ── Helpers ─────────────────────────────────────────────────────

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input: {}", path.display())),
        None => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                eprintln!("Reading from stdin; end with Ctrl-D");
            }
            let mut buf = String::new();
            stdin
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            info!("Diagram written to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Failures that carry a user-facing remedy are reported as such.
fn report(err: &anyhow::Error) {
    eprintln!("error: {err:#}");
    if let Some(diagram_err) = err.downcast_ref::<DiagramError>() {
        eprintln!("hint: {}", diagram_err.remedy());
    }
}

// ── Commands ────────────────────────────────────────────────────

struct GenerateArgs {
    kind: DiagramKind,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    prompt: Option<PathBuf>,
    model: Option<String>,
    config: Option<PathBuf>,
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let file = config::load_file(&config_path, args.config.is_some())?;
    let llm_config = config::resolve(file, config::Overrides::from_env(args.model));
    debug!(
        base_url = %llm_config.base_url,
        model = %llm_config.model,
        "Resolved LLM config"
    );

    let template = args
        .prompt
        .as_deref()
        .map(|p| {
            std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read prompt template: {}", p.display()))
        })
        .transpose()?;

    let code = read_input(args.input.as_deref())?;
    if code.trim().is_empty() {
        anyhow::bail!("No code to analyze; the input is empty");
    }

    let options = GatewayOptions {
        instruction_template: template.as_deref(),
        json_mode: llm_config.json_mode,
    };
    let client = LlmClient::new(llm_config);
    let request = DiagramRequest::new(code, args.kind);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match generate_diagram(&client, &request, options, &cancel).await? {
        Some(text) => write_output(args.output.as_deref(), &text),
        None => {
            info!("Cancelled");
            Ok(())
        }
    }
}

fn compile(kind: DiagramKind, input: Option<&Path>) -> Result<()> {
    let json = read_input(input)?;
    let text = build_diagram(kind, &json)?;
    write_output(None, &text)
}

// ── Main ────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,structurify=debug")),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate {
            kind,
            input,
            output,
            prompt,
            model,
            config,
        } => {
            generate(GenerateArgs {
                kind,
                input,
                output,
                prompt,
                model,
                config,
            })
            .await
        }
        Command::Compile { kind, input } => compile(kind, input.as_deref()),
        Command::Prompt { kind } => {
            println!("{}", system_prompt(kind));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
