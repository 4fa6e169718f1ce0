// tests/intake.rs
//
// Chat intake: link extraction, ingestion, reactions and the ops line.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use brief_relay::backend::IntakeOrigin;
use brief_relay::chat::{Author, ChatMessage};
use brief_relay::config::VerticalConfig;
use brief_relay::intake::{REACT_DUPLICATE, REACT_INSERTED, REACT_WARNING};
use brief_relay::IntakeHandler;
use common::{FakeBackend, FakeChat, RecordingNotifier};

const INTAKE: &str = "100";

fn handler(
    backend: &Arc<FakeBackend>,
    chat: &Arc<FakeChat>,
    notifier: &Arc<RecordingNotifier>,
) -> IntakeHandler {
    let verticals = vec![
        VerticalConfig {
            name: "energy".into(),
            intake_channel: Some(INTAKE.into()),
            output_channel: Some("900".into()),
        },
        VerticalConfig {
            name: "quiet".into(),
            intake_channel: None,
            output_channel: Some("901".into()),
        },
    ];
    IntakeHandler::new(backend.clone(), chat.clone(), notifier.clone(), &verticals)
}

fn message(channel: &str, content: &str) -> ChatMessage {
    ChatMessage {
        id: "m-1".into(),
        channel_id: channel.into(),
        content: content.into(),
        author: Author {
            id: "u-1".into(),
            username: "alice".into(),
            bot: false,
        },
        timestamp: None,
    }
}

#[tokio::test]
async fn partial_failure_reacts_warning_and_names_failed_url() {
    let backend = FakeBackend::new();
    let chat = FakeChat::new();
    let notifier = RecordingNotifier::new();
    backend.fail_url("https://b.example/2");

    let msg = message(INTAKE, "see https://a.example/1 and https://b.example/2");
    handler(&backend, &chat, &notifier).on_message(&msg).await;

    assert_eq!(chat.reactions(), vec![REACT_WARNING.to_string()]);
    let lines = notifier.lines();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.contains("inserted=1"), "{line}");
    assert!(line.contains("failed=1"), "{line}");
    assert!(line.contains("https://b.example/2"), "{line}");
    assert!(!line.contains("https://a.example/1"), "{line}");
}

#[tokio::test]
async fn inserted_and_duplicate_get_both_reactions() {
    let backend = FakeBackend::new();
    let chat = FakeChat::new();
    let notifier = RecordingNotifier::new();
    backend.know_url("https://b.example/old");

    let msg = message(INTAKE, "https://a.example/new https://b.example/old");
    let report = handler(&backend, &chat, &notifier)
        .handle(&msg)
        .await
        .unwrap()
        .expect("candidate message");

    assert_eq!((report.inserted, report.duplicate), (1, 1));
    assert!(report.failures.is_empty());
    assert_eq!(
        chat.reactions(),
        vec![REACT_INSERTED.to_string(), REACT_DUPLICATE.to_string()]
    );
    let lines = notifier.lines();
    assert_eq!(lines, vec!["intake energy: inserted=1 duplicate=1 (by alice)".to_string()]);
}

#[tokio::test]
async fn only_duplicates_get_recycle_reaction() {
    let backend = FakeBackend::new();
    let chat = FakeChat::new();
    let notifier = RecordingNotifier::new();
    backend.know_url("https://a.example/1");

    handler(&backend, &chat, &notifier)
        .on_message(&message(INTAKE, "https://a.example/1"))
        .await;
    assert_eq!(chat.reactions(), vec![REACT_DUPLICATE.to_string()]);
}

#[tokio::test]
async fn ingest_request_carries_chat_provenance() {
    let backend = FakeBackend::new();
    let chat = FakeChat::new();
    let notifier = RecordingNotifier::new();

    handler(&backend, &chat, &notifier)
        .on_message(&message(INTAKE, "https://a.example/1, https://a.example/1."))
        .await;

    let calls = backend.ingest_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1, "repeated link submitted once");
    let req = &calls[0];
    assert_eq!(req.url, "https://a.example/1");
    assert_eq!(req.vertical, "energy");
    assert_eq!(req.source, IntakeOrigin::Discord);
    assert_eq!(req.source_channel_id.as_deref(), Some(INTAKE));
    assert_eq!(req.source_message_id.as_deref(), Some("m-1"));
    assert_eq!(req.author_id.as_deref(), Some("u-1"));
    assert_eq!(req.author_username.as_deref(), Some("alice"));
    assert!(req.metadata.is_none());
}

#[tokio::test]
async fn non_candidates_are_ignored_silently() {
    let backend = FakeBackend::new();
    let chat = FakeChat::new();
    let notifier = RecordingNotifier::new();
    let h = handler(&backend, &chat, &notifier);

    let mut from_bot = message(INTAKE, "https://a.example/1");
    from_bot.author.bot = true;
    let elsewhere = message("555", "https://a.example/1");
    let no_links = message(INTAKE, "morning all, nothing to share");

    for msg in [&from_bot, &elsewhere, &no_links] {
        assert!(h.handle(msg).await.unwrap().is_none());
    }
    assert!(backend.ingest_calls.lock().unwrap().is_empty());
    assert!(chat.reactions().is_empty());
    assert!(notifier.lines().is_empty());
}

#[tokio::test]
async fn reaction_failure_is_reported_not_raised() {
    let backend = FakeBackend::new();
    let chat = FakeChat::new();
    let notifier = RecordingNotifier::new();
    chat.fail_reactions.store(true, Ordering::SeqCst);

    handler(&backend, &chat, &notifier)
        .on_message(&message(INTAKE, "https://a.example/1"))
        .await;

    // link was still ingested; counts and the reaction error both land in the ops log
    assert_eq!(backend.ingested_urls(), vec!["https://a.example/1"]);
    let lines = notifier.lines();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert_eq!(lines[0], "intake energy: inserted=1 duplicate=0 (by alice)");
    assert!(lines[1].contains("intake error on message m-1"), "{}", lines[1]);
}

#[tokio::test]
async fn failed_urls_are_logged_even_when_warning_reaction_fails() {
    let backend = FakeBackend::new();
    let chat = FakeChat::new();
    let notifier = RecordingNotifier::new();
    chat.fail_reactions.store(true, Ordering::SeqCst);
    backend.fail_url("https://b.example/2");

    handler(&backend, &chat, &notifier)
        .on_message(&message(INTAKE, "https://a.example/1 https://b.example/2"))
        .await;

    let lines = notifier.lines();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines[0].contains("inserted=1"), "{}", lines[0]);
    assert!(lines[0].contains("- https://b.example/2: HTTP 500"), "{}", lines[0]);
    assert!(lines[1].contains("intake error on message m-1"), "{}", lines[1]);
    assert!(chat.reactions().is_empty());
}
