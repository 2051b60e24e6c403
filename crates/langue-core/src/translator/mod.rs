mod llm;
mod traits;

pub use llm::LlmTranslator;
pub use traits::{ChunkTranslator, TranslatorInfo};

use crate::config::LlmConfig;
use crate::llm::{OpenAiChat, OpenAiClient};
use std::sync::Arc;

/// Create the LLM-backed chunk translator from configuration
pub fn create_translator(config: &LlmConfig, client: Arc<OpenAiClient>) -> Arc<dyn ChunkTranslator> {
    let chat = OpenAiChat::new(client, config.model.clone(), Some(config.temperature));
    Arc::new(LlmTranslator::new(Arc::new(chat)))
}
