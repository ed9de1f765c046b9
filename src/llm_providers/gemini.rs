use super::{InvocationResult, ProviderAdapter, ProviderClient, post_json, require_text};
use crate::error::Result;
use crate::history::{ChatRole, ConversationHistory};
use crate::providers::ProviderKind;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Gemini `generateContent` adapter.
///
/// Gemini is sent the new prompt only; earlier turns are remembered in the
/// session cache but never replayed to the backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeminiAdapter;

const MAX_OUTPUT_TOKENS: u32 = 4096;

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn sends_history_inline(&self) -> bool {
        false
    }

    fn build_request(&self, history: &ConversationHistory, prompt: &str, _model: &str) -> Value {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for turn in self.request_turns(history, prompt) {
            let role = match turn.role() {
                ChatRole::System => {
                    system_parts.push(json!({ "text": turn.content() }));
                    continue;
                }
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            contents.push(json!({
                "role": role,
                "parts": [{ "text": turn.content() }]
            }));
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                // Model is specified in the URL, not here
                "maxOutputTokens": MAX_OUTPUT_TOKENS
            }
        });
        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
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
        let url = format!("{}/models/{}:generateContent", client.base_url(), model);
        let request = client
            .http()
            .post(url)
            .query(&[("key", client.credential())]);

        let response = post_json(self.kind(), request, &body).await?;

        // {"candidates": [{"content": {"parts": [{"text": "..."}]}}]}
        let text = response["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<String>()
            });

        Ok(InvocationResult::complete(require_text(self.kind(), text)?))
    }
}
