use std::time::Duration;

use anyhow::Result;

use buddy_cli::cli::{Cli, Command};
use buddy_cli::telemetry;
use buddy_db::Connection;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::init();
    telemetry::init(&cli.log_level)?;

    let conn = Connection::open(&cli.members_db)
        .await?
        .with_timeout(Duration::from_millis(cli.timeout_ms));
    match cli.command {
        Command::Members(cmd) => cmd.run(&conn).await,
        Command::Fees(cmd) => cmd.run(&conn).await,
    }?;

    Ok(())
}
