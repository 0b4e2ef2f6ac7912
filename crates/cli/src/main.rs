use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;
use tradeframe_core::EngineConfig;

mod strategies;

use strategies::MaCrossover;

#[derive(Parser)]
#[command(name = "tradeframe")]
#[command(about = "Backtest-first algorithmic trading engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay historical candles through a strategy
    Backtest {
        /// Historical data CSV file (timestamp,open,high,low,close,volume)
        #[arg(short, long)]
        data: PathBuf,
        /// Engine config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: PathBuf,
        /// Fast moving-average period
        #[arg(long, default_value_t = 20)]
        fast: usize,
        /// Slow moving-average period
        #[arg(long, default_value_t = 50)]
        slow: usize,
        /// Optional history CSV output path
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Load and validate an engine config, then print the parsed result
    CheckConfig {
        /// Engine config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Backtest {
            data,
            config,
            fast,
            slow,
            out,
        } => {
            let config = EngineConfig::load(&config)?;
            let bars = tradeframe_backtest::load_bars(&data)?;
            let symbol = config
                .markets
                .first()
                .context("config defines no markets")?
                .symbol
                .clone();
            let mut series = BTreeMap::new();
            series.insert(symbol, bars);

            let mut account = config.build_account();
            let mut strategy = MaCrossover::new(fast, slow);
            let report =
                tradeframe_backtest::run(&mut account, &mut strategy, &series, &config)?;

            info!(
                score = report.score,
                final_balance = report.final_balance,
                max_leverage = report.max_leverage,
                max_profit = report.max_profit,
                min_profit = report.min_profit,
                max_drawdown = report.max_drawdown,
                "backtest complete"
            );
            if let Some(out) = out {
                report.write_history(&out)?;
                info!(path = %out.display(), rows = report.history.len(), "history written");
            }
        }
        Commands::CheckConfig { config } => {
            let loaded = EngineConfig::load(&config)?;
            info!(
                base = %loaded.base_symbol,
                markets = loaded.markets.len(),
                data_length = loaded.data_length,
                "config is valid"
            );
        }
    }
    Ok(())
}
