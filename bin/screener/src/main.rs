use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, UniverseProvider, UniverseSegment};
use engine::{report, universe, BatchRunner, RetryPolicy, Retrying, StaticUniverse, Throttle, YahooClient};
use scoring::{Analyzer, ScoringProfile, ScreeningGate};

#[derive(Parser)]
#[command(name = "screener", about = "Equity/ETF screener and scoring engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coarse gate over a universe and write the shortlist CSV.
    Screen {
        #[arg(long, value_enum, default_value_t = Mode::All)]
        mode: Mode,
    },
    /// Fully score a shortlist and write the dated analysis CSV.
    Analyze {
        /// Shortlist to score. Defaults to `screened_candidates_all.csv` in
        /// the output directory.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Check a random sample of US stocks against the strict diagnostic gate.
    Diagnose {
        #[arg(long, default_value_t = 10)]
        sample: usize,
    },
    /// Screen on Tuesdays and Thursdays, analyze every day.
    Daily,
}

/// Universe selector. Accepts the segment names used in report file names
/// (`US-stock`, `HK-ETF`) as well as their lowercase forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    #[value(name = "US-stock", alias = "us-stock")]
    UsStock,
    #[value(name = "HK-stock", alias = "hk-stock")]
    HkStock,
    #[value(name = "US-ETF", alias = "us-etf")]
    UsEtf,
    #[value(name = "HK-ETF", alias = "hk-etf")]
    HkEtf,
    All,
}

impl Mode {
    fn segments(self) -> Vec<UniverseSegment> {
        match self {
            Mode::UsStock => vec![UniverseSegment::UsStock],
            Mode::HkStock => vec![UniverseSegment::HkStock],
            Mode::UsEtf => vec![UniverseSegment::UsEtf],
            Mode::HkEtf => vec![UniverseSegment::HkEtf],
            Mode::All => UniverseSegment::ALL.to_vec(),
        }
    }

    /// Suffix of the shortlist file name.
    fn tag(self) -> String {
        match self {
            Mode::All => "all".to_string(),
            single => single.segments()[0].to_string(),
        }
    }
}

struct App {
    cfg: Config,
    profile: ScoringProfile,
    universe: StaticUniverse,
    runner: BatchRunner,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── Scoring profile ───────────────────────────────────────────────────────
    let profile = match &cfg.scoring_profile_path {
        Some(path) => ScoringProfile::load(path)?,
        None => ScoringProfile::preset(&cfg.scoring_profile)?,
    };
    info!(profile = %profile.name, "Screener starting");

    // ── Data source ───────────────────────────────────────────────────────────
    let yahoo = YahooClient::new(&cfg.yahoo_base_url)?.with_cookie_url(&cfg.yahoo_cookie_url)?;
    let policy = RetryPolicy::new(cfg.fetch_max_attempts, cfg.fetch_retry_delay);
    let provider = Arc::new(Retrying::new(yahoo, policy));
    let runner = BatchRunner::new(
        provider.clone(),
        provider,
        Throttle::new(cfg.throttle_min, cfg.throttle_max),
    )
    .with_periods(&cfg.screen_period, &cfg.analysis_period);

    let app = App {
        universe: StaticUniverse::new(&cfg.universe_dir),
        cfg,
        profile,
        runner,
    };

    match cli.command {
        Commands::Screen { mode } => app.screen(mode).await.map(|_| ()),
        Commands::Analyze { input } => app.analyze(input).await,
        Commands::Diagnose { sample } => app.diagnose(sample).await,
        Commands::Daily => app.daily().await,
    }
}

impl App {
    async fn screen(&self, mode: Mode) -> Result<PathBuf> {
        let mut batches = Vec::new();
        for segment in mode.segments() {
            let tickers = self
                .universe
                .tickers(segment)
                .await
                .with_context(|| format!("loading {segment} universe"))?;
            batches.push((segment, tickers));
        }

        let gate = ScreeningGate::new(self.profile.clone());
        let result = self.runner.screen(&batches, &gate).await;

        let path = report::shortlist_path(&self.cfg.output_dir, &mode.tag());
        report::write_shortlist(&path, &result.shortlisted)?;
        info!(
            run_id = %result.summary.run_id,
            shortlisted = result.summary.passed,
            total = result.summary.total,
            path = %path.display(),
            "Screen finished"
        );
        Ok(path)
    }

    async fn analyze(&self, input: Option<PathBuf>) -> Result<()> {
        let input = input.unwrap_or_else(|| report::shortlist_path(&self.cfg.output_dir, "all"));
        let candidates = report::read_candidates(&input)
            .with_context(|| format!("reading candidates from {}", input.display()))?;

        let analyzer = Analyzer::new(self.profile.clone());
        let result = self.runner.analyze(&candidates, &analyzer).await;

        let path = report::analysis_path(&self.cfg.output_dir, Local::now().date_naive());
        report::write_analysis(&path, &result.outcomes)?;
        info!(
            run_id = %result.summary.run_id,
            rows = result.outcomes.len(),
            path = %path.display(),
            "Analysis finished"
        );
        Ok(())
    }

    async fn diagnose(&self, sample: usize) -> Result<()> {
        let tickers = self
            .universe
            .tickers(UniverseSegment::UsStock)
            .await
            .context("loading US-stock universe")?;
        let picked = universe::sample(&tickers, sample);

        let gate = ScreeningGate::new(ScoringProfile::diagnostic());
        let result = self.runner.diagnose(&picked, &gate).await;
        info!(
            passed = result.summary.passed,
            sampled = result.summary.total,
            "Diagnostic finished"
        );
        Ok(())
    }

    async fn daily(&self) -> Result<()> {
        let today = Local::now().weekday();
        if matches!(today, Weekday::Tue | Weekday::Thu) {
            info!(%today, "Screening day");
            self.screen(Mode::All).await?;
        }

        let shortlist = report::shortlist_path(&self.cfg.output_dir, "all");
        if !shortlist.exists() {
            warn!(path = %shortlist.display(), "No shortlist yet, skipping analysis");
            return Ok(());
        }
        self.analyze(Some(shortlist)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_of(args: &[&str]) -> Mode {
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Screen { mode } => mode,
            _ => panic!("expected the screen command"),
        }
    }

    #[test]
    fn mode_accepts_segment_names() {
        assert_eq!(mode_of(&["screener", "screen", "--mode", "US-stock"]), Mode::UsStock);
        assert_eq!(mode_of(&["screener", "screen", "--mode", "HK-stock"]), Mode::HkStock);
        assert_eq!(mode_of(&["screener", "screen", "--mode", "US-ETF"]), Mode::UsEtf);
        assert_eq!(mode_of(&["screener", "screen", "--mode", "HK-ETF"]), Mode::HkEtf);
    }

    #[test]
    fn mode_accepts_lowercase_aliases_and_defaults_to_all() {
        assert_eq!(mode_of(&["screener", "screen", "--mode", "us-etf"]), Mode::UsEtf);
        assert_eq!(mode_of(&["screener", "screen"]), Mode::All);
        assert!(Cli::try_parse_from(["screener", "screen", "--mode", "EU-stock"]).is_err());
    }

    #[test]
    fn shortlist_tag_matches_segment_name() {
        assert_eq!(Mode::UsEtf.tag(), "US-ETF");
        assert_eq!(Mode::HkStock.tag(), "HK-stock");
        assert_eq!(Mode::All.tag(), "all");
    }
}
