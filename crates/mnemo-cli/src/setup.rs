//! CLI setup module
//!
//! Builds the storage, model gateway and orchestrator for a CLI run.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use mnemo_ai::{
    ConversationOrchestrator, ModelGateway, OpenAIClient, RedbConversationStore, connect_retrieval,
};
use mnemo_storage::Storage;

use crate::config::CliConfig;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Open (or create) the embedded database.
pub fn open_storage(config: &CliConfig) -> Result<Arc<Storage>> {
    let db_path = config.db_path();
    let storage = Storage::new(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    tracing::info!(db_path = %db_path.display(), "Database opened");
    Ok(Arc::new(storage))
}

fn api_key() -> Result<String> {
    match std::env::var(OPENAI_API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("OpenAI API key not found"),
    }
}

fn gateway(config: &CliConfig, api_key: &str) -> ModelGateway {
    let client = |model: &str| {
        let mut client = OpenAIClient::new(api_key).with_model(model);
        if let Some(url) = &config.llm.base_url {
            client = client.with_base_url(url.clone());
        }
        Arc::new(client)
    };

    ModelGateway::new(client(&config.llm.chat_model))
        .with_summarizer(client(&config.llm.summary_model))
        .with_condenser(client(&config.llm.rag_model))
}

/// Build the conversation orchestrator
pub async fn prepare_orchestrator(config: &CliConfig) -> Result<ConversationOrchestrator> {
    let chat_config = config.chat_config()?;
    let api_key = api_key()?;
    let storage = open_storage(config)?;

    let retrieval = connect_retrieval(
        &config.retrieval_backend(Some(api_key.clone())),
        &storage,
    );
    let store = Arc::new(RedbConversationStore::new(storage));

    let orchestrator = ConversationOrchestrator::new(
        store,
        gateway(config, &api_key),
        retrieval,
        chat_config,
    )
    .await?;
    Ok(orchestrator)
}
