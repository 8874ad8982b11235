use anyhow::Context;
use clap::Parser;
use dsw::config::{self, SupervisorConfig};
use dsw::launcher::{CommandSpec, ProcessLauncher};
use dsw::logmux;
use dsw::signal;
use dsw::supervisor::{StartupPlan, Supervisor};
use std::process::ExitCode;
use tracing::info;

/// Keeps the web dashboard and the Telegram bot alive: staggered startup,
/// periodic liveness probes, unconditional restart on exit.
#[derive(Parser, Debug)]
#[command(name = "dsw", version, about)]
struct Cli {
    /// Command line for the web dashboard service
    #[arg(long, default_value = config::WEB_COMMAND_DEFAULT)]
    web_cmd: String,

    /// Command line for the telegram bot service
    #[arg(long, default_value = config::BOT_COMMAND_DEFAULT)]
    bot_cmd: String,

    /// Seconds between liveness probes (default 30, or DSW_HEALTH_INTERVAL_SEC)
    #[arg(long)]
    interval: Option<u64>,

    /// Seconds to wait after starting the web service before starting the bot
    #[arg(long)]
    delay: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SupervisorConfig::resolve(&cli.web_cmd, &cli.bot_cmd, cli.interval, cli.delay);

    println!("{}", "=".repeat(50));
    println!("🚀 Starting web dashboard + telegram bot supervisor");
    println!("{}", "=".repeat(50));

    info!("web port: {}", config::web_port());
    info!(
        "{}: {}",
        config::BOT_TOKEN_ENV,
        if config::bot_token_present() { "set" } else { "not set" }
    );
    if let Some(owner) = config::owner_id() {
        info!("{}: {owner}", config::OWNER_ID_ENV);
    }

    signal::install().context("failed to install signal handlers")?;

    let web = CommandSpec::from_argv(&config.web_command)
        .context("web command is empty")?
        .with_env(config::web_env());
    let bot = CommandSpec::from_argv(&config.bot_command)
        .context("bot command is empty")?
        .with_env(config::bot_env());

    let launcher = ProcessLauncher::new(logmux::stdout_sink());
    let plan = StartupPlan::staggered(web, bot, config.bot_start_delay);

    let supervisor = Supervisor::start(launcher, plan, config.health_interval)
        .await
        .context("supervisor startup failed")?;
    supervisor.run().await;
    Ok(())
}
