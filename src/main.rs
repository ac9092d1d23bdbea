mod cli;

use anyhow::Result;
use clap::Parser;
use wellbeing_planner::config::AppConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = cli::Cli::parse();
    let cfg = AppConfig::load()?;
    cli::run(cli, cfg)
}
