use anyhow::{Context, Result};

use crate::cli::context::AppContext;
use crate::cli::output::output;

/// Handle ensure-collection command
pub async fn execute(ctx: &AppContext, json: bool) -> Result<()> {
    let report = ctx
        .vector_store
        .ensure_collection()
        .await
        .with_context(|| format!("Failed to ensure collection '{}'", ctx.vector_store.collection()))?;
    output(&report, json)
}
