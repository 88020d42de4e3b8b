use anyhow::{Context, Result};

use crate::cli::context::AppContext;
use crate::cli::output::{output, SearchOutput};

/// Handle search command
pub async fn execute(
    ctx: &AppContext,
    query: String,
    top_k: Option<usize>,
    kb: Option<String>,
    json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("Query cannot be empty");
    }
    let top_k = top_k.unwrap_or(ctx.config.retrieval.top_k);

    let provider = ctx
        .providers
        .current()
        .await
        .context("Failed to resolve embedding provider")?;
    let vector = provider
        .embed(&query)
        .await
        .context("Failed to embed query")?;
    let results = ctx
        .vector_store
        .search(&vector, top_k, kb.as_deref())
        .await
        .context("Vector search failed")?;

    output(
        &SearchOutput {
            query,
            top_k,
            knowledge_base_id: kb,
            results,
        },
        json,
    )
}
