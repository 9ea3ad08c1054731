// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios against a full relay on an ephemeral port.
//!
//! Each test spawns its own [`RelayHarness`] (mock store + mock gateway)
//! and drives it over real HTTP, so routing, headers, SSE framing, and the
//! encryption envelope are all exercised the way a deployed relay sees them.

use std::time::Duration;

use serde_json::json;
use sotto_core::{ConversationStatus, SenderType};
use sotto_test_utils::{DEFAULT_REPLY, HarnessLimits, RelayHarness, TEST_ADMIN_TOKEN, sse_data_lines};

/// Mint a session and return `(conversation_id, session_token)`.
async fn new_session(harness: &RelayHarness) -> (String, String) {
    let body: serde_json::Value = harness
        .client
        .post(harness.url("/visitor/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    (
        body["conversationId"].as_str().unwrap().to_string(),
        body["sessionToken"].as_str().unwrap().to_string(),
    )
}

/// Extract the delta text from one reconstructed `data: {json}` frame.
fn delta_of(frame: &str) -> String {
    let payload = frame
        .strip_prefix("data: ")
        .unwrap_or(frame)
        .trim_end();
    let parsed: serde_json::Value = serde_json::from_str(payload).unwrap();
    parsed["choices"][0]["delta"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn first_visit_mints_a_session_and_persists_messages() {
    let harness = RelayHarness::spawn().await;
    let (conversation_id, token) = new_session(&harness).await;

    let response = harness
        .client
        .post(harness.url("/visitor/messages"))
        .header("x-session-token", &token)
        .json(&json!({ "message": "hi, my order is late" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let stored = harness.store.messages_for(&conversation_id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sender_type, SenderType::Visitor);
    assert_eq!(stored[0].message, "hi, my order is late");

    // The visitor reads their own history back with the same token.
    let history: Vec<serde_json::Value> = harness
        .client
        .get(harness.url("/visitor/messages"))
        .header("x-session-token", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["message"], "hi, my order is late");
}

#[tokio::test]
async fn plain_chat_streams_and_persists_the_assistant_reply() {
    let harness = RelayHarness::spawn().await;
    let (conversation_id, token) = new_session(&harness).await;
    harness.gateway.push_reply("Your order ships tomorrow").await;

    let response = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&json!({
            "messages": [{"role": "user", "content": "where is my order?"}],
            "sessionToken": token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-ratelimit-remaining"));

    let body = response.text().await.unwrap();
    let lines = sse_data_lines(&body);
    assert_eq!(lines.last().map(String::as_str), Some("[DONE]"));
    let text: String = lines[..lines.len() - 1]
        .iter()
        .map(|raw| delta_of(raw))
        .collect();
    assert_eq!(text, "Your order ships tomorrow");

    let stored = harness.store.messages_for(&conversation_id);
    let last = stored.last().unwrap();
    assert_eq!(last.sender_type, SenderType::Ai);
    assert_eq!(last.message, "Your order ships tomorrow");
}

#[tokio::test]
async fn encrypted_chat_round_trips_per_chunk() {
    let harness = RelayHarness::spawn().await;
    let (_, token) = new_session(&harness).await;
    harness.gateway.push_reply("Happy to check on that").await;

    // Seal the request the way the widget does, keyed by the session token.
    let envelope = harness.seal(
        &json!({ "messages": [{"role": "user", "content": "hello"}] }),
        &token,
    );
    let response = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .header("x-encrypted", "true")
        .header("x-session-token", &token)
        .json(&envelope)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("x-encrypted").unwrap(),
        "true"
    );

    let body = response.text().await.unwrap();
    let lines = sse_data_lines(&body);
    assert_eq!(lines.last().map(String::as_str), Some("[DONE]"));

    // Every token before the sentinel decrypts to a full SSE frame.
    let text: String = lines[..lines.len() - 1]
        .iter()
        .map(|sealed| delta_of(&harness.open_chunk(sealed, &token)))
        .collect();
    assert_eq!(text, "Happy to check on that");
}

#[tokio::test]
async fn corrupted_chunk_fails_alone_without_breaking_the_rest() {
    let harness = RelayHarness::spawn().await;
    let (_, token) = new_session(&harness).await;
    harness.gateway.push_reply("one two three").await;

    let envelope = harness.seal(
        &json!({ "messages": [{"role": "user", "content": "hi"}] }),
        &token,
    );
    let body = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .header("x-encrypted", "true")
        .header("x-session-token", &token)
        .json(&envelope)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let lines = sse_data_lines(&body);
    let sealed = &lines[..lines.len() - 1];
    assert!(sealed.len() >= 2);

    // Flip ciphertext bits in the middle token only.
    let mut corrupted = sealed[1].clone();
    let tail = corrupted.split_off(corrupted.len() - 4);
    corrupted.push_str(if tail == "AAAA" { "BBBB" } else { "AAAA" });

    assert!(harness.try_open_chunk(&corrupted, &token).is_err());
    // Its neighbors still decrypt.
    assert!(harness.try_open_chunk(&sealed[0], &token).is_ok());
    assert!(harness.try_open_chunk(sealed.last().unwrap(), &token).is_ok());
}

#[tokio::test]
async fn assigned_agent_blocks_the_ai_path() {
    let harness = RelayHarness::spawn().await;
    let (conversation_id, token) = new_session(&harness).await;
    harness.store.assign_admin(&conversation_id, "admin-7");

    let response = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&json!({
            "messages": [{"role": "user", "content": "hello?"}],
            "sessionToken": token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "AGENT_ASSIGNED");
}

#[tokio::test]
async fn closed_conversation_refuses_the_ai_path() {
    let harness = RelayHarness::spawn().await;
    let (conversation_id, token) = new_session(&harness).await;
    harness
        .store
        .force_status(&conversation_id, ConversationStatus::Closed);

    let response = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&json!({
            "messages": [{"role": "user", "content": "hello?"}],
            "sessionToken": token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "CONVERSATION_CLOSED");
}

#[tokio::test]
async fn handoff_keyword_escalates_without_touching_the_gateway() {
    let harness = RelayHarness::spawn().await;
    let (conversation_id, token) = new_session(&harness).await;

    let response = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&json!({
            "messages": [{"role": "user", "content": "I want to talk to a HUMAN"}],
            "sessionToken": token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["agentRequested"], true);

    let conversation = harness.store.conversation(&conversation_id).unwrap();
    assert_eq!(conversation.status, ConversationStatus::WaitingForAgent);

    // The canned acknowledgment was persisted as an assistant message.
    let stored = harness.store.messages_for(&conversation_id);
    let last = stored.last().unwrap();
    assert_eq!(last.sender_type, SenderType::Ai);
    assert!(last.message.contains("human agent"));
}

#[tokio::test]
async fn ip_rate_limit_rejects_with_retry_after() {
    let harness = RelayHarness::spawn_with_limits(HarnessLimits {
        per_ip: 2,
        per_conversation: 30,
        max_concurrent_streams: 50,
    })
    .await;

    for _ in 0..2 {
        let response = harness
            .client
            .post(harness.url("/encrypted-chat-ai"))
            .json(&json!({ "messages": [{"role": "user", "content": "hi"}] }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        // Drain the stream so its slot is not left open.
        let _ = response.text().await;
    }

    let response = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&json!({ "messages": [{"role": "user", "content": "hi"}] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    assert!(response.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn concurrency_cap_sheds_the_excess_stream() {
    let harness = RelayHarness::spawn_with_limits(HarnessLimits {
        per_ip: 100,
        per_conversation: 30,
        max_concurrent_streams: 2,
    })
    .await;

    let release_a = harness.gateway.push_held_reply("held a").await;
    let release_b = harness.gateway.push_held_reply("held b").await;

    let request = json!({ "messages": [{"role": "user", "content": "hi"}] });
    let open_a = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&request)
        .send()
        .await
        .unwrap();
    let open_b = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(open_a.status(), 200);
    assert_eq!(open_b.status(), 200);

    // Both slots held open: the third caller is shed before any upstream call.
    let shed = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(shed.status(), 503);
    assert_eq!(shed.headers().get("retry-after").unwrap(), "30");

    // Release both streams and drain them; their slots free up.
    release_a.send(()).unwrap();
    release_b.send(()).unwrap();
    let _ = open_a.text().await;
    let _ = open_b.text().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let after = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), 200);
    let lines = sse_data_lines(&after.text().await.unwrap());
    let text: String = lines[..lines.len() - 1]
        .iter()
        .map(|raw| delta_of(raw))
        .collect();
    assert_eq!(text, DEFAULT_REPLY);
}

#[tokio::test]
async fn admin_claims_replies_and_closes() {
    let harness = RelayHarness::spawn().await;
    let (conversation_id, _token) = new_session(&harness).await;

    let authed = |request: reqwest::RequestBuilder| {
        request.header("authorization", format!("Bearer {TEST_ADMIN_TOKEN}"))
    };

    // The open conversation shows up on the dashboard list.
    let listed: Vec<serde_json::Value> = authed(
        harness.client.get(harness.url("/admin/conversations")),
    )
    .send()
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], conversation_id.as_str());

    let claim = authed(harness.client.post(
        harness.url(&format!("/admin/conversations/{conversation_id}/claim")),
    ))
    .json(&json!({ "adminId": "admin-7" }))
    .send()
    .await
    .unwrap();
    assert_eq!(claim.status(), 204);
    assert_eq!(
        harness
            .store
            .conversation(&conversation_id)
            .unwrap()
            .assigned_admin_id
            .as_deref(),
        Some("admin-7")
    );

    let reply = authed(harness.client.post(
        harness.url(&format!("/admin/conversations/{conversation_id}/messages")),
    ))
    .json(&json!({ "message": "Hi, agent here", "adminId": "admin-7" }))
    .send()
    .await
    .unwrap();
    assert_eq!(reply.status(), 200);
    let stored = harness.store.messages_for(&conversation_id);
    assert_eq!(stored.last().unwrap().sender_type, SenderType::Admin);

    let close = authed(harness.client.post(
        harness.url(&format!("/admin/conversations/{conversation_id}/close")),
    ))
    .send()
    .await
    .unwrap();
    assert_eq!(close.status(), 204);
    assert_eq!(
        harness.store.conversation(&conversation_id).unwrap().status,
        ConversationStatus::Closed
    );
}

#[tokio::test]
async fn garbled_body_maps_to_a_decryption_failure() {
    let harness = RelayHarness::spawn().await;

    let response = harness
        .client
        .post(harness.url("/encrypted-chat-ai"))
        .header("x-encrypted", "true")
        .header("content-type", "application/json")
        .body("not an envelope")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
