//! `knowbridge search`: query the knowledge base directly.

use knowbridge_config::AppConfig;
use knowbridge_tools::SearchKnowledgeTool;

pub async fn run(
    config: AppConfig,
    query: String,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::remote_client(&config)?;
    let tool = SearchKnowledgeTool::new(client).with_limit(limit.unwrap_or(config.remote.search_limit));

    println!("{}", tool.search(&query).await);
    Ok(())
}
