use anyhow::Context;
use echo_study::{
    api,
    config::Config,
    embedding::build_embedding_client,
    llm::OpenRouterClient,
    logging,
    qdrant::QdrantService,
    rag::{AnswerService, AnswerSettings},
    server,
};
use std::sync::Arc;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    logging::init_tracing("echo-chat");
    config.log_summary();

    let embedder = build_embedding_client(&config)
        .await
        .context("Failed to initialize embedding model")?;
    let index = QdrantService::new(&config).context("Failed to connect to Qdrant")?;
    index
        .ensure_collection(config.embedding_dimension as u64)
        .await
        .context("Failed to ensure Qdrant collection exists")?;
    let llm = OpenRouterClient::new(&config).context("Failed to build language model client")?;

    let service = AnswerService::new(
        embedder,
        Arc::new(index),
        Arc::new(llm),
        AnswerSettings::from_config(&config),
    );
    let app = api::create_chat_router(Arc::new(service));

    server::serve(app, config.server_port, DEFAULT_PORT)
        .await
        .context("Server terminated unexpectedly")
}
