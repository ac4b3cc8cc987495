//! OpenAI 兼容接口的 SSE 流式输出解析
//!
//! 将 `reqwest` 的字节流转换为文本增量片段，处理跨块的半行、空事件与 `data: [DONE]`。

use anyhow::{Result, anyhow};
use bytes::Bytes;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};

use super::CompletionProfile;
use crate::config::LLMConfig;
use crate::utils::text::truncate_chars;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamChunkRaw {
    choices: Vec<StreamChoiceRaw>,
}

#[derive(Debug, Deserialize)]
struct StreamChoiceRaw {
    delta: DeltaRaw,
}

#[derive(Debug, Deserialize)]
struct DeltaRaw {
    #[serde(default)]
    content: Option<String>,
}

/// 单行解析结果
enum SseEvent {
    Delta(String),
    Done,
}

/// 字节流到文本片段的适配器，结束标记之后不再产出
pub struct ChatCompletionStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: String,
    /// 尚未凑成完整 UTF-8 字符的尾部字节
    pending: Vec<u8>,
    finished: bool,
}

impl ChatCompletionStream {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: String::new(),
            pending: Vec::new(),
            finished: false,
        }
    }
}

impl Stream for ChatCompletionStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            match try_parse_line(&mut this.buffer) {
                Some(Ok(SseEvent::Delta(delta))) => return Poll::Ready(Some(Ok(delta))),
                Some(Ok(SseEvent::Done)) => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => {}
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend_from_slice(&bytes);
                    if let Err(e) = decode_pending(&mut this.pending, &mut this.buffer) {
                        this.finished = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(anyhow!("Stream interrupted: {}", e))));
                }
                Poll::Ready(None) => {
                    if !this.pending.is_empty() {
                        this.finished = true;
                        return Poll::Ready(Some(Err(anyhow!(
                            "Stream ended inside a UTF-8 sequence ({} dangling bytes)",
                            this.pending.len()
                        ))));
                    }
                    // 末尾可能残留一行没有换行符的数据
                    if !this.buffer.trim().is_empty() {
                        this.buffer.push('\n');
                        continue;
                    }
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// 把已凑齐的字节解码进文本缓冲区，被分块截断的多字节字符留待下一块补全
fn decode_pending(pending: &mut Vec<u8>, buffer: &mut String) -> Result<()> {
    let valid_up_to = match std::str::from_utf8(pending) {
        Ok(text) => {
            buffer.push_str(text);
            pending.clear();
            return Ok(());
        }
        // error_len 为 None 表示只是末尾不完整
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(e) => return Err(anyhow!("Invalid UTF-8 in stream: {}", e)),
    };

    let tail = pending.split_off(valid_up_to);
    let head = std::mem::replace(pending, tail);
    buffer.push_str(&String::from_utf8(head)?);
    Ok(())
}

/// 从缓冲区取出一条完整的 SSE 数据行并解析，空增量会被跳过
fn try_parse_line(buffer: &mut String) -> Option<Result<SseEvent>> {
    loop {
        let newline_pos = buffer.find('\n')?;
        let line = buffer[..newline_pos].trim().to_string();
        buffer.drain(..=newline_pos);

        let Some(data) = line.strip_prefix("data:") else {
            // 空行、event:、id:、retry: 等
            continue;
        };
        let data = data.trim();

        if data == "[DONE]" {
            return Some(Ok(SseEvent::Done));
        }

        match serde_json::from_str::<StreamChunkRaw>(data) {
            Ok(raw) => {
                let delta = raw
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                    .unwrap_or_default();
                if delta.is_empty() {
                    continue;
                }
                return Some(Ok(SseEvent::Delta(delta)));
            }
            Err(e) => {
                return Some(Err(anyhow!(
                    "Failed to parse stream chunk: {} (data: {})",
                    e,
                    truncate_chars(data, 200)
                )));
            }
        }
    }
}

/// 发起流式 chat completion 请求，状态码非 2xx 时直接返回错误
pub(crate) async fn open_chat_stream(
    http: &reqwest::Client,
    config: &LLMConfig,
    profile: &CompletionProfile,
    prompt: &str,
) -> Result<ChatCompletionStream> {
    let url = format!(
        "{}/chat/completions",
        config.api_base_url.trim_end_matches('/')
    );
    let mut messages = Vec::with_capacity(2);
    if !profile.preamble.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: &profile.preamble,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: prompt,
    });

    let request = ChatRequest {
        model: &config.model,
        messages,
        temperature: profile.temperature,
        max_tokens: profile.max_tokens,
        stream: true,
    };

    let mut builder = http.post(&url).json(&request);
    if !config.api_key.is_empty() {
        builder = builder.bearer_auth(&config.api_key);
    }

    let response = builder.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "Streaming request failed with status {}: {}",
            status,
            truncate_chars(&body, 300)
        ));
    }

    Ok(ChatCompletionStream::new(response.bytes_stream()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn make_sse_bytes(lines: &[&str]) -> Vec<Result<Bytes, reqwest::Error>> {
        lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("{}\n", line))))
            .collect()
    }

    #[tokio::test]
    async fn test_parse_multiple_tokens() {
        let data = make_sse_bytes(&[
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            "",
            r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#,
            "",
            r#"data: {"choices":[{"delta":{"content":" world"}}]}"#,
            "",
            "data: [DONE]",
        ]);

        let stream = ChatCompletionStream::new(futures::stream::iter(data));
        let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;

        assert_eq!(fragments, vec!["Hello".to_string(), " world".to_string()]);
    }

    #[tokio::test]
    async fn test_parse_line_split_across_chunks() {
        let data: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from(r#"data: {"choices":[{"del"#)),
            Ok(Bytes::from("ta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n")),
        ];

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));
        assert_eq!(stream.next().await.unwrap().unwrap(), "Hi");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"It’s sunny\"}}]}\n\ndata: [DONE]\n";
        let bytes = line.as_bytes();
        let split = line.find('’').unwrap() + 1;
        let data: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..split + 1])),
            Ok(Bytes::copy_from_slice(&bytes[split + 1..])),
        ];

        let fragments: Vec<String> = ChatCompletionStream::new(futures::stream::iter(data))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["It’s sunny".to_string()]);
    }

    #[tokio::test]
    async fn test_truly_invalid_utf8_is_error() {
        let data: Vec<Result<Bytes, reqwest::Error>> =
            vec![Ok(Bytes::from_static(b"data: \xff\xfe\n"))];

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));
        assert!(stream.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_stops_after_done() {
        let data = make_sse_bytes(&[
            "data: [DONE]",
            r#"data: {"choices":[{"delta":{"content":"late"}}]}"#,
        ]);

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let data: Vec<Result<Bytes, reqwest::Error>> = vec![Ok(Bytes::from(
            r#"data: {"choices":[{"delta":{"content":"tail"}}]}"#,
        ))];

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));
        assert_eq!(stream.next().await.unwrap().unwrap(), "tail");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let data = make_sse_bytes(&["data: {not json}"]);

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));
        assert!(stream.next().await.unwrap().is_err());
    }
}
