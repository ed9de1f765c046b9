use super::{InvocationResult, ProviderAdapter, ProviderClient, post_json, require_text};
use crate::error::Result;
use crate::history::{ChatRole, ConversationHistory};
use crate::providers::ProviderKind;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Groq adapter speaking the OpenAI-compatible chat completions API
#[derive(Debug, Default, Clone, Copy)]
pub struct GroqAdapter;

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 5024;
const TOP_P: u32 = 1;

#[async_trait]
impl ProviderAdapter for GroqAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    fn build_request(&self, history: &ConversationHistory, prompt: &str, model: &str) -> Value {
        let messages: Vec<Value> = self
            .request_turns(history, prompt)
            .iter()
            .map(|turn| {
                let role = match turn.role() {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::System => "system",
                };
                json!({ "role": role, "content": turn.content() })
            })
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "top_p": TOP_P,
            "stream": false,
            "stop": null
        })
    }

    async fn invoke(
        &self,
        client: &ProviderClient,
        history: &ConversationHistory,
        prompt: &str,
        model: &str,
    ) -> Result<InvocationResult> {
        let body = self.build_request(history, prompt, model);
        let url = format!("{}/openai/v1/chat/completions", client.base_url());
        let request = client.http().post(url).bearer_auth(client.credential());

        let response = post_json(self.kind(), request, &body).await?;
        let text = response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string);

        Ok(InvocationResult::complete(require_text(self.kind(), text)?))
    }
}
