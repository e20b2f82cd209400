use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quorum_core::config::{AppConfig, TradeMode};
use quorum_core::ConfigLoader;
use quorum_exchange::{BinanceFuturesGateway, ExchangeGateway, PaperExecution};
use quorum_ledger::Ledger;
use quorum_trader::{LogNotifier, Notifier, Scanner, Trader, WebhookNotifier};
use quorum_web_api::ApiServer;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quorum")]
#[command(about = "Consensus-driven unattended trading loop", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading loop with the web API
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Run the decision pipeline for one symbol and print the result
    /// without touching any positions
    Analyze {
        /// Symbol to analyze (e.g. BTCUSDT)
        symbol: String,
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
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
        Commands::Run { config } => run(&config).await,
        Commands::Analyze { symbol, config } => analyze(&symbol, &config).await,
    }
}

fn load_config(path: &str) -> Result<AppConfig> {
    let config = ConfigLoader::load_from(path).context("loading configuration")?;
    // Misconfiguration is fatal by design: better no trading than wrong
    // trading.
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn build_gateway(config: &AppConfig) -> Arc<dyn ExchangeGateway> {
    match config.mode {
        TradeMode::Paper => {
            tracing::info!("paper mode: real market data, simulated fills");
            Arc::new(PaperExecution::new(
                BinanceFuturesGateway::public(config.exchange.api_url.clone()),
                dec!(10000),
            ))
        }
        TradeMode::Live => {
            tracing::warn!("live mode: orders will reach the real account");
            Arc::new(BinanceFuturesGateway::signed(
                config.exchange.api_url.clone(),
                config.exchange.api_key.clone(),
                config.exchange.api_secret.clone(),
            ))
        }
    }
}

fn build_notifier(config: &AppConfig) -> Arc<dyn Notifier> {
    match &config.notifier.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    }
}

async fn run(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let gateway = build_gateway(&config);
    let notifier = build_notifier(&config);
    let ledger = Ledger::connect(&config.database.url)
        .await
        .context("opening ledger database")?;

    let trader = Trader::spawn(&config, gateway, ledger.clone(), notifier)?;

    let server = ApiServer::new(trader.handle(), ledger);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    tokio::select! {
        result = server.serve(&addr) => {
            result.context("API server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    trader.shutdown().await;
    Ok(())
}

async fn analyze(symbol: &str, config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let gateway = build_gateway(&config);
    let scanner = Scanner::from_config(&config, gateway)?;

    let analysis = scanner.analyze_symbol(symbol).await?;
    let decision = &analysis.decision;

    println!("{symbol}");
    println!(
        "  signal:     {} ({:.0}% confidence, {} stars)",
        decision.signal.as_str(),
        decision.confidence * 100.0,
        decision.stars
    );
    println!("  outlook:    {}", analysis.outlook.as_str());
    println!(
        "  confirmed:  {}",
        if decision.horizon_confirmed { "yes" } else { "no" }
    );
    match (analysis.verdict.atr, analysis.verdict.atr_pct) {
        (Some(atr), Some(pct)) => println!(
            "  gate:       {} (ATR {atr}, {pct:.2}% of price)",
            if analysis.verdict.passed { "pass" } else { "blocked" }
        ),
        _ => println!(
            "  gate:       {}",
            if analysis.verdict.passed { "pass (disabled)" } else { "blocked (no data)" }
        ),
    }
    for line in &decision.breakdown {
        println!(
            "    {:<15} {} {} (weight {:.2}, score {:.3})",
            line.strategy.as_str(),
            line.signal.as_str(),
            line.strength.as_str(),
            line.weight,
            line.weighted_score
        );
    }
    if let Some(plan) = &analysis.plan {
        println!(
            "  plan:       {} qty {} @ {} | SL {} | TP {} | R:R {:.1}",
            plan.side.as_str(),
            plan.quantity,
            plan.entry_price,
            plan.stop_loss,
            plan.take_profit,
            plan.reward_risk
        );
    } else {
        println!("  plan:       none (not actionable)");
    }

    Ok(())
}
