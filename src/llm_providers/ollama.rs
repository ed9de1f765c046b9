use super::{InvocationResult, ProviderAdapter, ProviderClient, ensure_success, require_text};
use crate::error::{BuddyError, Result};
use crate::history::{ChatRole, ConversationHistory};
use crate::log_debug;
use crate::providers::ProviderKind;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};

/// Ollama adapter; the only streaming backend.
///
/// The NDJSON token stream is drained to completion before returning, so
/// callers never observe partial text.
#[derive(Debug, Default, Clone, Copy)]
pub struct OllamaAdapter;

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// Splits a byte stream into NDJSON lines and extracts their text.
///
/// Lines may straddle network chunks; partial lines are held until their
/// newline arrives or the stream ends.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
    done: bool,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the backend has sent its final chunk
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes, returning the text of every completed line in order
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.pending.extend_from_slice(bytes);
        let mut tokens = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(token) = self.decode_line(&line)? {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }

    /// Flush a trailing line that had no newline
    pub fn finish(&mut self) -> Result<Option<String>> {
        let line = std::mem::take(&mut self.pending);
        self.decode_line(&line)
    }

    fn decode_line(&mut self, line: &[u8]) -> Result<Option<String>> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let chunk: OllamaChunk = serde_json::from_str(text)
            .map_err(|e| BuddyError::provider(format!("malformed Ollama stream chunk: {e}")))?;
        if let Some(error) = chunk.error {
            return Err(BuddyError::provider(format!("Ollama error: {error}")));
        }
        if chunk.done {
            self.done = true;
        }
        Ok(chunk.message.map(|message| message.content))
    }
}

/// Drain an Ollama chat stream and concatenate its text in arrival order
pub async fn drain_chat_stream<S, B, E>(stream: S) -> Result<String>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BuddyError>,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = ChunkDecoder::new();
    let mut output = String::new();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(Into::into)?;
        for token in decoder.push(bytes.as_ref())? {
            output.push_str(&token);
        }
    }
    if let Some(token) = decoder.finish()? {
        output.push_str(&token);
    }

    if !decoder.is_done() {
        log_debug!("Ollama stream ended without a final chunk");
    }
    Ok(output)
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
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
            "stream": true,
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
        let url = format!("{}/api/chat", client.base_url());
        let mut request = client.http().post(url).json(&body);
        // Plain Ollama ignores this; authenticating proxies in front of it need it
        if !client.credential().is_empty() {
            request = request.bearer_auth(client.credential());
        }

        let response = request.send().await?;
        let response = ensure_success(self.kind(), response).await?;

        log_debug!("Draining Ollama stream for model {}", model);
        let text = drain_chat_stream(response.bytes_stream()).await?;

        Ok(InvocationResult::streamed(require_text(
            self.kind(),
            Some(text),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn ok_chunks(chunks: &[&str]) -> impl Stream<Item = Result<Vec<u8>>> {
        let owned: Vec<Result<Vec<u8>>> = chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    #[tokio::test]
    async fn test_stream_concatenates_tokens_in_order() {
        let chunks = ok_chunks(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"He\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"llo\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        ]);

        let text = drain_chat_stream(chunks).await.expect("stream should drain");
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let chunks = ok_chunks(&[
            "{\"message\":{\"content\":\"He\"}}\n{\"mess",
            "age\":{\"content\":\"llo\"},\"done\":true}",
        ]);

        let text = drain_chat_stream(chunks).await.expect("stream should drain");
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_error_mid_stream_fails_whole_call() {
        let chunks = stream::iter(vec![
            Ok(b"{\"message\":{\"content\":\"He\"}}\n".to_vec()),
            Err(BuddyError::provider("connection reset")),
        ]);

        let err = drain_chat_stream(chunks).await.expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Provider);
    }

    #[test]
    fn test_error_line_is_provider_error() {
        let mut decoder = ChunkDecoder::new();
        let err = decoder
            .push(b"{\"error\":\"model 'llama9' not found\"}\n")
            .expect_err("must fail");
        assert!(err.to_string().contains("llama9"));
    }
}
