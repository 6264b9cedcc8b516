//! CLI binary for roadmap-audit.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AuditConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use roadmap_audit::pipeline::engine;
use roadmap_audit::{
    analyze_file, inspect, AuditConfig, CriterionStatus, DocumentKind, EvaluationRecord,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn spinner(prefix: &'static str, msg: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix(prefix);
    bar.set_message(msg);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Audit a roadmap exported as PDF
  roadmap-audit analyze roadmap.pdf

  # Audit a PowerPoint deck, JSON output
  roadmap-audit analyze roadmap.pptx --json > audit.json

  # Audit from a URL with a specific model
  roadmap-audit analyze --provider openai --model gpt-4.1 https://example.com/q3-roadmap.pdf

  # Check what would be sent (no API key needed)
  roadmap-audit inspect roadmap.pdf

  # Run the HTTP boundary (feature `server`)
  ACCESS_CODE=pmo-2024 roadmap-audit serve --listen 0.0.0.0:8080

GRADING SCALE:
  A+ ≥ 90%   A ≥ 80%   B+ ≥ 70%   B ≥ 60%   C ≥ 50%   D ≥ 40%   F < 40%

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (anthropic, openai, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  ACCESS_CODE             Access code required by `serve`
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  ROADMAP_AUDIT_PDFIUM_CACHE  Override the pdfium cache directory

  PDFium (~30 MB) is downloaded automatically the first time a PDF is
  rendered and cached in ~/.cache/roadmap-audit/pdfium-7690/.
"#;

/// Score PMO roadmap slide decks with a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "roadmap-audit",
    version,
    about = "Score PMO roadmap slide decks against the governance template using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "ROADMAP_AUDIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, global = true, env = "ROADMAP_AUDIT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit a deck and print the evaluation.
    Analyze {
        /// Local PDF/PPT/PPTX path or HTTP/HTTPS URL.
        input: String,

        /// Print the EvaluationRecord as JSON instead of a report.
        #[arg(long, env = "ROADMAP_AUDIT_JSON")]
        json: bool,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Normalise a deck without calling the model (no API key needed).
    Inspect {
        /// Local PDF/PPT/PPTX path or HTTP/HTTPS URL.
        input: String,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Serve `POST /api/analyze` over HTTP.
    #[cfg(feature = "server")]
    Serve {
        /// Address to listen on.
        #[arg(long, env = "ROADMAP_AUDIT_LISTEN", default_value = "127.0.0.1:8080")]
        listen: std::net::SocketAddr,

        /// Access code requests must carry. Unset means open access.
        #[arg(long, env = "ACCESS_CODE", hide_env_values = true)]
        access_code: Option<String>,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM model ID (default for anthropic: claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: anthropic, openai, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file replacing the built-in rubric.
    #[arg(long, env = "ROADMAP_AUDIT_RUBRIC")]
    rubric: Option<PathBuf>,

    /// Max tokens in the evaluation reply.
    #[arg(long, env = "ROADMAP_AUDIT_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "ROADMAP_AUDIT_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Model call timeout in seconds.
    #[arg(long, env = "ROADMAP_AUDIT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// PDF page upscaling factor (1.0–4.0).
    #[arg(long, env = "ROADMAP_AUDIT_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "ROADMAP_AUDIT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the feedback that matters in the default mode.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Analyze {
            ref input,
            json,
            ref model,
            ref render,
        } => {
            let config = build_config(Some(model), render, None).await?;
            if needs_engine(input) {
                prepare_engine(cli.quiet || json)?;
            }

            let bar = (!cli.quiet && !json).then(|| spinner("Analysing", "waiting for the model…"));
            let result = analyze_file(input, &config).await;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
            let record = result.context("Analysis failed")?;

            if json {
                let out = serde_json::to_string_pretty(&record)
                    .context("Failed to serialise evaluation")?;
                println!("{out}");
            } else {
                print_report(input, &record);
            }
        }

        Command::Inspect {
            ref input,
            json,
            ref render,
        } => {
            let config = build_config(None, render, None).await?;
            if needs_engine(input) {
                prepare_engine(cli.quiet || json)?;
            }
            let summary = inspect(input, &config)
                .await
                .context("Failed to inspect document")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary)
                        .context("Failed to serialise summary")?
                );
            } else {
                let kind = match summary.kind {
                    DocumentKind::Pdf => "PDF (rendered page by page)",
                    DocumentKind::SlideContainer => "Presentation (sent whole)",
                };
                println!("File:         {}", summary.file_name);
                println!("Kind:         {}", kind);
                println!("Size:         {} bytes", summary.size_bytes);
                println!("Attachments:  {}", summary.attachments);
                println!("Payload:      {} bytes base64", summary.payload_bytes);
            }
        }

        #[cfg(feature = "server")]
        Command::Serve {
            listen,
            ref access_code,
            ref model,
        } => {
            let render = RenderArgs {
                scale: 2.0,
                download_timeout: 120,
            };
            let config = build_config(Some(model), &render, access_code.clone()).await?;
            if access_code.as_deref().unwrap_or("").is_empty() {
                tracing::warn!("ACCESS_CODE is not set: the endpoint is open to anyone");
            }
            let service = roadmap_audit::AuditService::from_config(config);
            roadmap_audit::server::listen(listen, service)
                .await
                .context("Server failed")?;
        }
    }

    Ok(())
}

/// PDFs need the rendering engine; presentations never touch it.
fn needs_engine(input: &str) -> bool {
    let name = input.split(['?', '#']).next().unwrap_or(input);
    DocumentKind::from_file_name(name) == Some(DocumentKind::Pdf) && !engine::is_available_offline()
}

/// Download pdfium before the audit starts so the spinner reflects it.
fn prepare_engine(quiet: bool) -> Result<()> {
    let bar = (!quiet).then(|| spinner("PDF engine", "downloading (first run only)…"));
    let result = tokio::task::block_in_place(engine::prepare);
    if let Some(bar) = bar {
        match &result {
            Ok(()) => bar.finish_with_message("ready ✓"),
            Err(_) => bar.abandon_with_message("unavailable"),
        }
    }
    result.context("Failed to provision the PDFium engine")
}

/// Map CLI args to `AuditConfig`.
async fn build_config(
    model: Option<&ModelArgs>,
    render: &RenderArgs,
    access_code: Option<String>,
) -> Result<AuditConfig> {
    let mut builder = AuditConfig::builder()
        .render_scale(render.scale)
        .download_timeout_secs(render.download_timeout);

    if let Some(m) = model {
        builder = builder
            .max_tokens(m.max_tokens)
            .temperature(m.temperature)
            .api_timeout_secs(m.api_timeout);
        if let Some(ref path) = m.rubric {
            let rubric = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read rubric from {:?}", path))?;
            builder = builder.rubric(rubric);
        }
    }
    if let Some(code) = access_code {
        builder = builder.access_code(code);
    }

    let mut config = builder.build().context("Invalid configuration")?;
    if let Some(m) = model {
        config.model = m.model.clone();
        config.provider_name = m.provider.clone();
    }
    Ok(config)
}

fn print_report(input: &str, record: &EvaluationRecord) {
    let pct = record.score_percentage();
    let grade = record.effective_grade().to_string();
    let grade = if pct >= 70.0 {
        green(&grade)
    } else if pct >= 50.0 {
        yellow(&grade)
    } else {
        red(&grade)
    };

    println!();
    println!("{}  {}", bold("Roadmap audit"), dim(input));
    println!(
        "  Score  {}/{}  ({:.0}%)   Grade {}",
        bold(&format!("{}", record.global_score)),
        record.max_score,
        pct,
        bold(&grade)
    );
    if !record.summary.is_empty() {
        println!();
        println!("  {}", record.summary);
    }

    println!();
    for c in &record.criteria {
        let mark = match &c.status {
            Some(CriterionStatus::Pass) => green("✔"),
            Some(CriterionStatus::Warning) => yellow("⚠"),
            Some(CriterionStatus::Fail) => red("✘"),
            _ => dim("?"),
        };
        println!(
            "  {} {:<40} {}",
            mark,
            c.name,
            dim(&format!("{}/{}", c.score, c.max_score))
        );
        if !c.details.is_empty() {
            println!("      {}", dim(&c.details));
        }
        for r in &c.recommendations {
            println!("      {} {}", cyan("→"), r);
        }
    }

    let (pass, warn, fail) = record.status_counts();
    println!();
    println!(
        "  {} pass  {} warning  {} fail",
        green(&pass.to_string()),
        yellow(&warn.to_string()),
        red(&fail.to_string())
    );

    if !record.general_recommendations.is_empty() {
        println!();
        println!("{}", bold("Recommendations"));
        for (i, r) in record.general_recommendations.iter().enumerate() {
            println!("  {}. {}", i + 1, r);
        }
    }
    println!();
}
