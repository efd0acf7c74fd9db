//! chantier-tracker binary: HTTP server and maintenance commands.

use anyhow::{Context, Result};
use chantier_tracker::cli::{Cli, Command};
use chantier_tracker::config::Config;
use chantier_tracker::db::{Cascade, Database};
use chantier_tracker::logging::{LogOutput, init_logging};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    init_logging(
        &LogOutput::parse(&config.logging.output),
        &config.logging.level,
        cli.verbose,
    )?;

    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)
        .with_context(|| format!("opening database {}", config.server.db_path.display()))?
        .with_propagator(Arc::new(Cascade::new(config.stats.cascade_team)));

    info!(
        db_path = %config.server.db_path.display(),
        cascade_team = config.stats.cascade_team,
        "Database ready"
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            chantier_tracker::api::serve(Arc::new(db), &config.server).await?;
        }
        Command::RecomputeTeams => {
            let teams = db.recompute_all_team_stats()?;
            for team in &teams {
                println!(
                    "{:>5}  {:<30} active={:<3} performance={}",
                    team.id, team.name, team.active_tasks, team.performance
                );
            }
            info!(count = teams.len(), "Team stats recomputed");
        }
    }

    Ok(())
}
