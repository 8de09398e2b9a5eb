//! Chat response pipeline
//!
//! Two-branch pipeline: attempt the remote completion, and on any
//! non-success condition (error, timeout, structurally empty body) switch
//! to the knowledge-grounded fallback. The fallback chain guarantees the
//! response is never empty: remote completion → knowledge-grounded
//! template → fixed help message.

use manglo_common::config::ChatConfig;
use manglo_common::db::models::KnowledgeItem;
use std::sync::Arc;
use tracing::warn;

use super::completion::{ChatMessage, CompletionBackend};
use super::knowledge_store::KnowledgeStore;

/// Domain-expert persona injected ahead of every conversation
pub const SYSTEM_PROMPT: &str = "\
You are a comprehensive mango farming and agriculture expert. You specialize in all aspects \
of mango cultivation: disease identification, treatment, and prevention (Anthracnose, \
Bacterial Canker, Powdery Mildew, Sooty Mould, Die Back, and others), pest management \
(fruit flies, scale insects, mealybugs, hoppers, gall midges, weevils), soil and nutrition \
programs, irrigation and water management, pruning and orchard management, variety selection \
and propagation, harvest timing and post-harvest handling, and organic practices.\n\
\n\
Provide practical, actionable advice for farmers. Include specific product names, dosages, \
and application methods when relevant. Offer both chemical and organic options, consider \
different scales of farming, and always prioritize safety and sustainable practices. \
Keep answers structured and reasonably concise.";

/// Fixed, topic-agnostic help text used when the knowledge base has
/// nothing relevant (or is unreachable)
pub const HELP_MESSAGE: &str = "\
**Mango Farming Assistant**\n\
\n\
I'd be happy to help you with any mango-related questions! I can assist with:\n\
\n\
**Disease Management:** identification and treatment of diseases like Anthracnose, \
Bacterial Canker, Powdery Mildew, and Sooty Mould, plus prevention strategies.\n\
**Cultivation Practices:** site selection, planting, fertilization, irrigation, and \
orchard maintenance.\n\
**Pest Control:** fruit fly management, scale insects, mealybug control, and integrated \
pest management.\n\
**Varieties and Selection:** commercial variety recommendations and climate adaptation.\n\
**Harvest and Post-Harvest:** proper harvesting techniques, storage, and handling.\n\
\n\
Please ask me a specific question about mango farming and I'll provide detailed guidance!";

/// Number of knowledge items included in a composed fallback response
const FALLBACK_ITEM_LIMIT: usize = 3;

/// How many knowledge rows to retrieve before composing
const FALLBACK_SEARCH_LIMIT: u32 = 5;

pub struct ChatResponder {
    backend: Arc<dyn CompletionBackend>,
    store: KnowledgeStore,
    config: ChatConfig,
}

impl ChatResponder {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        store: KnowledgeStore,
        config: ChatConfig,
    ) -> Self {
        Self {
            backend,
            store,
            config,
        }
    }

    pub fn backend(&self) -> Arc<dyn CompletionBackend> {
        self.backend.clone()
    }

    /// Assemble the full message list: system prompt, then the bounded
    /// conversation context oldest-first, then the new user message.
    pub fn build_messages(&self, message: &str, context: &[ChatMessage]) -> Vec<ChatMessage> {
        let bound = (self.config.history_limit as usize) * 2;
        let context = if context.len() > bound {
            &context[context.len() - bound..]
        } else {
            context
        };

        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend_from_slice(context);
        messages.push(ChatMessage::user(message));
        messages
    }

    /// Produce a response for `message`. Never fails and never returns an
    /// empty string.
    pub async fn respond(&self, message: &str, context: &[ChatMessage]) -> String {
        let messages = self.build_messages(message, context);

        match self.backend.complete(&messages).await {
            Ok(text) if !text.trim().is_empty() => return text,
            Ok(_) => warn!("Remote completion returned empty body; using knowledge fallback"),
            Err(e) => warn!("Remote completion failed ({}); using knowledge fallback", e),
        }

        self.fallback(message).await
    }

    /// The knowledge-grounded branch, independently callable (the stream
    /// relay uses it directly).
    pub async fn fallback(&self, message: &str) -> String {
        match self.store.search(message, FALLBACK_SEARCH_LIMIT).await {
            Ok(items) if !items.is_empty() => compose_knowledge_response(&items),
            Ok(_) => HELP_MESSAGE.to_string(),
            Err(e) => {
                // Unreachable store degrades to the same UX as no match,
                // but with its own log signal
                warn!("Knowledge store unavailable during fallback: {}", e);
                HELP_MESSAGE.to_string()
            }
        }
    }
}

/// Compose a templated response from knowledge items: up to three items
/// grouped under their category/subcategory headers, with a related-topics
/// note for any distinct categories beyond the first.
pub fn compose_knowledge_response(items: &[KnowledgeItem]) -> String {
    let mut response = format!("**{} Information**\n\n", items[0].category);

    for item in items.iter().take(FALLBACK_ITEM_LIMIT) {
        match &item.subcategory {
            Some(sub) => response.push_str(&format!("**{} - {}**\n\n", sub, item.topic)),
            None => response.push_str(&format!("**{}**\n\n", item.topic)),
        }
        response.push_str(&item.content);
        response.push_str("\n\n");
    }

    let mut extra_categories: Vec<&str> = Vec::new();
    for item in items {
        if item.category != items[0].category
            && !extra_categories.contains(&item.category.as_str())
        {
            extra_categories.push(&item.category);
        }
    }

    if !extra_categories.is_empty() {
        response.push_str(&format!(
            "**Related Topics:** ask me more about {}!\n",
            extra_categories.join(", ")
        ));
    }

    response
}
