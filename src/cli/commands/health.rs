use anyhow::Result;

use crate::cli::context::AppContext;
use crate::cli::output::output;

/// Handle health command. Prints the report, then fails if any dependency is down.
pub async fn execute(ctx: &AppContext, json: bool) -> Result<()> {
    let report = ctx.health_checker().check().await;
    output(&report, json)?;
    report.into_result()?;
    Ok(())
}
