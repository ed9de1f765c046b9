use super::{InvocationResult, ProviderAdapter, ProviderClient, post_json, require_text};
use crate::error::Result;
use crate::history::{ChatRole, ConversationHistory};
use crate::providers::ProviderKind;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Anthropic Messages API adapter
#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicAdapter;

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 3024;

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn build_request(&self, history: &ConversationHistory, prompt: &str, model: &str) -> Value {
        // System turns move to the top-level `system` field
        let mut system_prompt = String::new();
        let mut messages = Vec::new();
        for turn in self.request_turns(history, prompt) {
            let role = match turn.role() {
                ChatRole::System => {
                    if !system_prompt.is_empty() {
                        system_prompt.push_str("\n\n");
                    }
                    system_prompt.push_str(turn.content());
                    continue;
                }
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(json!({ "role": role, "content": turn.content() }));
        }

        let mut body = json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "messages": messages,
        });
        if !system_prompt.is_empty() {
            body["system"] = Value::String(system_prompt);
        }
        body
    }

    async fn invoke(
        &self,
        client: &ProviderClient,
        history: &ConversationHistory,
        prompt: &str,
        model: &str,
    ) -> Result<InvocationResult> {
        let body = self.build_request(history, prompt, model);
        let url = format!("{}/v1/messages", client.base_url());
        let request = client
            .http()
            .post(url)
            .header("x-api-key", client.credential())
            .header("anthropic-version", API_VERSION);

        let response = post_json(self.kind(), request, &body).await?;
        let text = response["content"].as_array().map(|blocks| {
            blocks
                .iter()
                .filter(|block| block["type"] == "text")
                .filter_map(|block| block["text"].as_str())
                .collect::<String>()
        });

        Ok(InvocationResult::complete(require_text(self.kind(), text)?))
    }
}
