// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for the completion gateway's streaming responses.
//!
//! Converts a reqwest response byte stream into [`StreamChunk`]s using the
//! `eventsource-stream` crate for SSE protocol compliance. Each chunk keeps
//! the raw `data:` payload (the relay re-frames and re-encrypts it verbatim)
//! alongside the extracted text delta (accumulated for persistence).

use eventsource_stream::Eventsource;
use futures::stream::StreamExt;
use serde::Deserialize;
use sotto_core::{ChunkStream, SottoError, StreamChunk};

/// Terminal sentinel on the gateway stream, passed through to callers.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct CompletionFrame {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Parses a streaming gateway response into a stream of [`StreamChunk`]s.
///
/// The stream ends when the gateway sends the `[DONE]` sentinel (which is
/// not emitted as a chunk; the relay appends its own sentinel downstream).
/// Frames that are not valid completion JSON are passed through with no
/// delta rather than dropped, so the caller still sees them.
pub fn parse_completion_stream(response: reqwest::Response) -> ChunkStream {
    let events = response.bytes_stream().eventsource();

    let mapped = events
        .filter_map(|result| async move {
            match result {
                Ok(event) => {
                    if event.data.trim() == DONE_SENTINEL {
                        return None;
                    }
                    let delta = serde_json::from_str::<CompletionFrame>(&event.data)
                        .ok()
                        .and_then(|frame| {
                            frame.choices.into_iter().next().and_then(|c| c.delta.content)
                        });
                    Some(Ok(StreamChunk {
                        raw: event.data,
                        delta,
                    }))
                }
                Err(e) => Some(Err(SottoError::UpstreamGateway {
                    status: 0,
                    source: Some(Box::new(e)),
                })),
            }
        })
        .boxed();

    mapped
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parses_delta_frames_in_order() {
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let response = mock_sse_response(sse).await;
        let mut stream = parse_completion_stream(response);

        let mut deltas = Vec::new();
        while let Some(chunk) = stream.next().await {
            deltas.push(chunk.unwrap().delta);
        }
        assert_eq!(
            deltas,
            vec![Some("Hel".to_string()), Some("lo".to_string())]
        );
    }

    #[tokio::test]
    async fn done_sentinel_is_not_emitted_as_a_chunk() {
        let sse = "data: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_completion_stream(response);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn raw_payload_is_preserved_verbatim() {
        let frame = r#"{"choices":[{"delta":{"content":"hi"},"finish_reason":null}]}"#;
        let sse = format!("data: {frame}\n\ndata: [DONE]\n\n");
        let response = mock_sse_response(&sse).await;
        let mut stream = parse_completion_stream(response);

        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.raw, frame);
        assert_eq!(chunk.delta.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn frames_without_content_pass_through_with_no_delta() {
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{}}]}\n\n",
            "data: not-json-at-all\n\n",
            "data: [DONE]\n\n",
        );
        let response = mock_sse_response(sse).await;
        let mut stream = parse_completion_stream(response);

        let first = stream.next().await.unwrap().unwrap();
        assert!(first.delta.is_none());
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.raw, "not-json-at-all");
        assert!(second.delta.is_none());
        assert!(stream.next().await.is_none());
    }
}
