//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use jobplanner_core::analysts::{PerspectiveReport, ScoringCollaborator};
use jobplanner_core::collaborator::{LlmNarrator, LlmScorer, OfflineScorer};
use jobplanner_core::narrative::{NarrativeService, OfflineNarrator};
use jobplanner_core::pipeline::{
    PipelineOutput, ProgressReporter, Services, rank_and_schedule,
};
use jobplanner_llm::ChatClient;
use jobplanner_shared::{
    AppConfig, PipelineConfig, Preferences, init_config, load_config, load_config_from,
    resolve_api_key,
};
use tracing::{info, warn};

use crate::input::read_candidates;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// jobplanner: multi-perspective job ranking and interview planning.
#[derive(Parser)]
#[command(
    name = "jobplanner",
    version,
    about = "Rank job opportunities from several analyst perspectives and schedule interviews.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.jobplanner/jobplanner.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Result output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Rank candidates and schedule interviews for the top picks.
    Rank {
        /// JSON file with the candidates (`-` reads stdin).
        input: PathBuf,

        /// Maximum interviews per day.
        #[arg(long)]
        max_per_day: Option<usize>,

        /// Number of top-ranked candidates to schedule.
        #[arg(long)]
        top_k: Option<usize>,

        /// Seed for slot generation and fallback scores.
        #[arg(long)]
        seed: Option<u64>,

        /// Anchor date (YYYY-MM-DD); slots start the day after.
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Skip the model service and use fallback scores only.
        #[arg(long)]
        offline: bool,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the configured analyst perspectives.
    Perspectives,

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

/// Initialize tracing based on CLI flags. Logs go to stderr so JSON output
/// on stdout stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "jobplanner=info",
        1 => "jobplanner=debug",
        _ => "jobplanner=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Rank {
            input,
            max_per_day,
            top_k,
            seed,
            today,
            offline,
            format,
        } => {
            let opts = RankOptions {
                preferences: Preferences { max_per_day, top_k },
                seed,
                today,
                offline,
                format,
            };
            cmd_rank(&input, opts, config_path).await
        }
        Command::Perspectives => cmd_perspectives(config_path),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// rank
// ---------------------------------------------------------------------------

struct RankOptions {
    preferences: Preferences,
    seed: Option<u64>,
    today: Option<NaiveDate>,
    offline: bool,
    format: OutputFormat,
}

async fn cmd_rank(input: &Path, opts: RankOptions, config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let candidates = read_candidates(input)?;

    let mut pipeline = PipelineConfig::from(&config);
    if let Some(seed) = opts.seed {
        pipeline = pipeline.with_seed(seed);
    }
    if let Some(today) = opts.today {
        pipeline = pipeline.with_anchor_date(today);
    }

    let client = if opts.offline {
        None
    } else {
        match resolve_api_key(&config.llm) {
            Ok(key) => Some(ChatClient::new(&config.llm, key, pipeline.perspective_timeout)?),
            Err(e) => {
                warn!(error = %e, "no model API key, scoring offline");
                None
            }
        }
    };

    let (scorer, narrator): (Box<dyn ScoringCollaborator>, Box<dyn NarrativeService>) =
        match client {
            Some(client) => (
                Box::new(LlmScorer::new(client.clone(), &config.llm.default_model)),
                Box::new(LlmNarrator::new(client, &config.llm.default_model)),
            ),
            None => (Box::new(OfflineScorer), Box::new(OfflineNarrator)),
        };

    info!(
        input = %input.display(),
        candidates = candidates.len(),
        offline = opts.offline,
        "ranking candidates"
    );

    let reporter = CliProgress::new();
    let services = Services {
        scorer: scorer.as_ref(),
        narrator: narrator.as_ref(),
    };
    let output = rank_and_schedule(
        &candidates,
        &pipeline,
        &opts.preferences,
        services,
        &reporter,
    )
    .await?;

    match opts.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => print!("{}", render_text(&output)),
    }

    Ok(())
}

/// Human-readable report of a run.
fn render_text(output: &PipelineOutput) -> String {
    let mut out = String::new();
    out.push('\n');

    out.push_str("  Ranking\n");
    if output.ranking.is_empty() {
        out.push_str("    (no candidates)\n");
    }
    for r in &output.ranking {
        let scores: Vec<String> = r.individual_scores.iter().map(|s| format!("{s:.0}")).collect();
        out.push_str(&format!(
            "    #{:<3} {:>3}  {:<6}  {} @ {}  [{}]\n",
            r.rank,
            r.final_score,
            r.consensus_level.as_str(),
            r.title,
            r.label,
            scores.join(", ")
        ));
    }

    out.push_str("\n  Schedule\n");
    for day in &output.schedule {
        out.push_str(&format!("    {}\n", day.date.format("%Y-%m-%d (%a)")));
        for i in &day.interviews {
            let flag = if i.overflow { "  [overflow]" } else { "" };
            out.push_str(&format!(
                "      {}  #{} {} @ {}{flag}\n        {}\n",
                i.slot.period.time_range(),
                i.priority_rank,
                i.title,
                i.label,
                i.preparation_tip
            ));
        }
    }
    out.push_str(&format!(
        "    {} interviews over {} days ({} per day)\n",
        output.summary.total_interviews, output.summary.span_days, output.summary.average_per_day
    ));

    if !output.reports.is_empty() {
        out.push_str("\n  Analysts\n");
        for report in &output.reports {
            out.push_str(&format!("    {:<20} {}", report.display_name, report.outcome.as_str()));
            if let Some(reason) = report.reason {
                out.push_str(&format!(" ({}, {} fallback)", reason.as_str(), report.fallback_count));
            }
            out.push('\n');
        }
    }

    out.push_str(&format!("\n  Summary\n    {}\n\n", output.narrative.text));
    out.push_str(&format!("  Run: {}\n\n", output.run_id));
    out
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn perspective_done(&self, report: &PerspectiveReport) {
        self.spinner.set_message(format!(
            "{} scored ({})",
            report.display_name,
            report.outcome.as_str()
        ));
    }

    fn done(&self, _output: &PipelineOutput) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// perspectives / config
// ---------------------------------------------------------------------------

fn cmd_perspectives(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    for p in &config.perspectives {
        let model = p.model.as_deref().unwrap_or(&config.llm.default_model);
        println!("{:<12} {:<20} weight {:.2}  model {model}", p.id, p.display_name, p.weight);
        println!("{:<12} {}", "", p.focus_description);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobplanner_core::pipeline::SilentProgress;
    use jobplanner_shared::Candidate;

    #[test]
    fn cli_parses_rank_flags() {
        let cli = Cli::try_parse_from([
            "jobplanner",
            "rank",
            "jobs.json",
            "--top-k",
            "3",
            "--today",
            "2026-05-01",
            "--offline",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Command::Rank {
                top_k,
                today,
                offline,
                ..
            } => {
                assert_eq!(top_k, Some(3));
                assert_eq!(today, NaiveDate::from_ymd_opt(2026, 5, 1));
                assert!(offline);
            }
            _ => panic!("expected rank"),
        }
    }

    #[tokio::test]
    async fn text_report_lists_ranking_and_schedule() {
        let candidates = vec![
            Candidate::new(0, "Acme", "Backend Engineer"),
            Candidate::new(1, "Globex", "Data Engineer"),
        ];
        let config = PipelineConfig::default()
            .with_anchor_date(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        let services = Services {
            scorer: &OfflineScorer,
            narrator: &OfflineNarrator,
        };
        let output = rank_and_schedule(
            &candidates,
            &config,
            &Preferences::default(),
            services,
            &SilentProgress,
        )
        .await
        .unwrap();

        let text = render_text(&output);
        assert!(text.contains("#1"));
        assert!(text.contains("Backend Engineer @ Acme"));
        assert!(text.contains("2 interviews over"));
        assert!(text.contains("fallback"));
    }
}
