//! `knowbridge serve`: start the HTTP gateway.

use knowbridge_config::AppConfig;
use tracing::info;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        info!(port, "Port overridden from the command line");
        config.gateway.port = port;
    }

    println!("Knowbridge Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Book agent: {}", config.remote.book_agent_url);
    println!("   Model:      {} ({})", config.llm.model, config.llm.provider);

    knowbridge_gateway::start(config).await?;

    Ok(())
}
