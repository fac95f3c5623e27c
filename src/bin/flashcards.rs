use anyhow::Context;
use echo_study::{api, config::Config, llm::OpenRouterClient, logging, server, study::StudyService};
use std::sync::Arc;

const DEFAULT_PORT: u16 = 8040;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_for_study().context("Failed to load configuration")?;
    logging::init_tracing("flashcards");
    config.log_summary();

    let llm = OpenRouterClient::new(&config).context("Failed to build language model client")?;
    let service = StudyService::from_config(Arc::new(llm), &config);
    let app = api::create_flashcards_router(Arc::new(service));

    server::serve(app, config.server_port, DEFAULT_PORT)
        .await
        .context("Server terminated unexpectedly")
}
