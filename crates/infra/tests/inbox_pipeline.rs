//! End-to-end inbound pipeline test
//!
//! Drives the real worker against wiremock-backed relay, Slack, and Jira
//! endpoints, with tasks persisted through the real store-backed task
//! service: one pending mention with `shouldCreateJira` becomes a local
//! review task linked to both the Slack message and the created ticket.

use std::sync::Arc;

use beacon_core::{ProviderClient, SettingsStore, TaskService};
use beacon_domain::{JiraConfig, LinkKind, RelayConfig, SlackConfig, TaskSource};
use beacon_infra::{InboxWorker, InboxWorkerConfig, JiraClient, JsonSettingsStore, RelayQueueClient, SlackClient};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn slack_client(server: &MockServer) -> SlackClient {
    let client = SlackClient::with_base_url(
        SlackConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_id: "U123".to_string(),
        },
        server.uri(),
    )
    .unwrap();
    client.set_tokens(beacon_domain::CredentialRecord::new(
        beacon_domain::Provider::Slack,
        "xoxb-token".to_string(),
        None,
        None,
    ));
    client
}

#[tokio::test]
async fn jira_mention_becomes_review_task_with_links() {
    let relay = MockServer::start().await;
    let slack = MockServer::start().await;
    let jira = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pending-tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "tasks": [{
                "id": "pending-1",
                "title": "Ship the report",
                "description": "Q2 numbers, due Friday",
                "channel": "C123",
                "messageTs": "1749540000.000100",
                "user": "U999",
                "teamId": "T42",
                "shouldCreateJira": true,
                "shouldCreateConfluence": false
            }]
        })))
        .mount(&relay)
        .await;
    Mock::given(method("POST"))
        .and(path("/pending-tasks"))
        .and(body_string_contains("pending-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
        .expect(1)
        .mount(&relay)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({ "id": "10001", "key": "AMP-42" })),
        )
        .mount(&jira)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&slack)
        .await;
    Mock::given(method("POST"))
        .and(path("/reactions.remove"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .mount(&slack)
        .await;
    Mock::given(method("POST"))
        .and(path("/reactions.add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .mount(&slack)
        .await;

    let store = Arc::new(JsonSettingsStore::in_memory());
    let tasks = Arc::new(TaskService::new(store.clone()));

    let worker = InboxWorker::new(
        Arc::new(RelayQueueClient::new(RelayConfig { base_url: relay.uri() }).unwrap()),
        Arc::new(slack_client(&slack)),
        tasks.clone(),
        Some(Arc::new(
            JiraClient::with_base_url(
                JiraConfig {
                    domain: "acme.atlassian.net".to_string(),
                    email: "bot@acme.dev".to_string(),
                    api_token: "secret".to_string(),
                    project_key: "AMP".to_string(),
                },
                jira.uri(),
            )
            .unwrap(),
        )),
        None,
        InboxWorkerConfig::default(),
    );

    let processed = worker.poll_once().await.unwrap();
    assert_eq!(processed, 1);

    let stored = tasks.list().unwrap();
    assert_eq!(stored.len(), 1);

    let task = &stored[0];
    assert_eq!(task.title, "Validate Jira ticket: AMP-42");
    assert_eq!(task.source, TaskSource::Slack);
    assert_eq!(task.source_id.as_deref(), Some("pending-1"));

    let kinds: Vec<LinkKind> = task.linked_items.iter().map(|l| l.kind).collect();
    assert!(kinds.contains(&LinkKind::Slack));
    assert!(kinds.contains(&LinkKind::Jira));

    let jira_link = task.linked_items.iter().find(|l| l.kind == LinkKind::Jira).unwrap();
    assert!(jira_link.url.as_deref().unwrap().ends_with("/browse/AMP-42"));

    // Task list went through the settings store, not a side channel.
    assert!(store.get("tasks").unwrap().is_some());
}
