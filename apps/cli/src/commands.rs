//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use courseforge_core::pipeline::{self, BuildConfig, ProgressReporter};
use courseforge_license::Allowlist;
use courseforge_model::OpenRouterClient;
use courseforge_search::WikipediaSource;
use courseforge_shared::{init_config, load_config, validate_api_key, AppConfig};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// courseforge — assemble open-licensed courses from web content.
#[derive(Parser)]
#[command(
    name = "courseforge",
    version,
    about = "Assemble an open-licensed course (syllabus, lessons, quizzes, reading list) from web-sourced content.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build a course package for a topic.
    Build {
        /// Course topic.
        #[arg(long)]
        topic: String,

        /// Number of weeks (defaults to config).
        #[arg(long)]
        weeks: Option<u32>,

        /// Lessons per week (defaults to config).
        #[arg(long)]
        lessons_per_week: Option<u32>,

        /// Advisory minimum curated resources (defaults to config).
        #[arg(long)]
        min_resources: Option<u32>,

        /// Comma-separated license allowlist (defaults to config).
        #[arg(long)]
        licenses: Option<String>,

        /// Output directory (defaults to config).
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "courseforge=info",
        1 => "courseforge=debug",
        _ => "courseforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            topic,
            weeks,
            lessons_per_week,
            min_resources,
            licenses,
            out,
        } => {
            cmd_build(
                &topic,
                weeks,
                lessons_per_week,
                min_resources,
                licenses.as_deref(),
                out.as_deref(),
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

async fn cmd_build(
    topic: &str,
    weeks: Option<u32>,
    lessons_per_week: Option<u32>,
    min_resources: Option<u32>,
    licenses: Option<&str>,
    out: Option<&str>,
) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let weeks = weeks.unwrap_or(config.defaults.weeks);
    let lessons_per_week = lessons_per_week.unwrap_or(config.defaults.lessons_per_week);
    if weeks < 1 || lessons_per_week < 1 {
        return Err(eyre!("weeks and lessons-per-week must both be at least 1"));
    }

    let allowlist = Allowlist::parse(licenses.unwrap_or(&config.defaults.license_allowlist));
    let output_dir = PathBuf::from(out.unwrap_or(&config.defaults.output_dir));

    let api_key = std::env::var(&config.openrouter.api_key_env)?;
    let generator = OpenRouterClient::new(api_key, config.openrouter.default_model.clone())?;
    let source = WikipediaSource::new()?;

    let build_config = BuildConfig {
        topic: topic.to_string(),
        weeks,
        lessons_per_week,
        min_resources: min_resources.unwrap_or(config.defaults.min_resources),
        allowlist,
        output_dir,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(topic, weeks, lessons_per_week, "building course");

    let reporter = CliProgress::new();
    let result = pipeline::build_course(&build_config, &source, &generator, &reporter).await?;
    reporter.finish();

    println!();
    println!("  Course built successfully!");
    println!("  Topic:   {}", result.manifest.topic);
    println!("  Lessons: {}", result.manifest.lessons.len());
    println!("  Output:  {}", result.artifacts[0].display());
    println!();
    println!("{}", serde_json::to_string_pretty(&result.manifest)?);

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Bridges pipeline progress onto an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{bar:30.cyan/dim} {percent:>3}% {msg}")
                .expect("valid progress template"),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn report(&self, message: &str, fraction: f64) {
        self.bar.set_position((fraction * 100.0).round() as u64);
        self.bar.set_message(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
