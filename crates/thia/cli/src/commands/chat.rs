//! Interactive session on the terminal

use crate::error::CliResult;
use crate::repl::Repl;
use thia_engine::Thia;
use tokio::io::BufReader;

/// Execute chat command
pub async fn execute(thia: Thia<'_>, show_banner: bool) -> CliResult<()> {
    let repl = Repl::new(thia).with_banner(show_banner);
    let reason = repl
        .run(
            BufReader::new(tokio::io::stdin()),
            std::io::stdout(),
            tokio::signal::ctrl_c(),
        )
        .await?;
    tracing::info!(?reason, "Goodbye");
    Ok(())
}
