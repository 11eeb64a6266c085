//! End-to-end pipeline scenarios over scripted capabilities
//!
//! Exercises the full post-message flow: retrieval fallback layering,
//! don't-know web retry, source snapshots, auto-titling, and the
//! not-found contract.

mod common;

use common::{build_service, ScriptedGenerator, ScriptedIndex, ScriptedWeb};
use lorebook::error::LorebookError;
use lorebook::pipeline::{PostMessageRequest, RetrievalEngine, RetrievalOrigin};
use lorebook::providers::Passage;

fn scored(content: &str, score: f32) -> (Passage, f32) {
    (Passage::scored(content, Some(format!("{}.txt", content)), score), score)
}

/// A single relevant passage is returned as-is.
#[tokio::test]
async fn single_relevant_passage_returned_exactly() {
    let index = ScriptedIndex::with_scored(vec![scored("the one", 0.3)]);
    let web = ScriptedWeb::failing();
    let engine = RetrievalEngine::new(index, web);

    let result = engine.retrieve("X", 4).await;
    assert_eq!(result.origin, RetrievalOrigin::Local);
    assert_eq!(result.passages.len(), 1);
    assert_eq!(result.passages[0].content, "the one");
}

/// Only irrelevant local passages: web results become the answer's
/// sources.
#[tokio::test]
async fn low_relevance_local_results_fall_back_to_web_sources() {
    let index = ScriptedIndex::with_scored(vec![scored("far", 0.85), scored("farther", 1.2)]);
    let web = ScriptedWeb::with_results(vec![
        Passage::new("web fact one", Some("https://one".to_string())),
        Passage::new("web fact two", Some("https://two".to_string())),
    ]);
    let generator = ScriptedGenerator::always("Answer grounded on the web [Source 1].");
    let (_dir, store, service) = build_service(index, web.clone(), generator);

    let chat = service.create_chat(Some("Titled already".to_string())).unwrap();
    let reply = service
        .post_message(&chat.id, PostMessageRequest::from_content("question"))
        .await
        .unwrap();

    assert_eq!(web.call_count(), 1);
    assert_eq!(reply.sources.len(), 2);
    assert_eq!(reply.sources[0].source.as_deref(), Some("https://one"));
    assert_eq!(reply.sources[1].source.as_deref(), Some("https://two"));

    // The persisted assistant message froze the same snapshot
    let messages = store.messages(&chat.id).unwrap();
    let assistant = messages.last().unwrap();
    assert_eq!(assistant.sources.as_ref().unwrap().len(), 2);
}

/// A don't-know answer fires the web retry; a substantive clean answer
/// replaces the original along with its sources.
#[tokio::test]
async fn dont_know_retry_accepts_substantive_web_answer() {
    let index = ScriptedIndex::with_scored(vec![scored("weak grounding", 0.5)]);
    let web = ScriptedWeb::with_results(vec![Passage::new(
        "fresh web snippet",
        Some("https://w".to_string()),
    )]);
    let eighty_chars = "b".repeat(80);
    let generator = ScriptedGenerator::new(vec![
        Ok("I don't know the answer to that.".to_string()),
        Ok(eighty_chars.clone()),
        Ok("A generated title".to_string()),
    ]);
    let (_dir, _store, service) = build_service(index, web.clone(), generator.clone());

    let chat = service.create_chat(None).unwrap();
    let reply = service
        .post_message(&chat.id, PostMessageRequest::from_content("what is foo?"))
        .await
        .unwrap();

    assert_eq!(reply.answer, eighty_chars);
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.sources[0].source.as_deref(), Some("https://w"));
    // The retry searched the raw question
    assert_eq!(web.queries.lock().unwrap()[0].0, "what is foo?");
    assert_eq!(web.queries.lock().unwrap()[0].1, 3);
}

/// When the retry's web search fails, the original answer and sources
/// stand.
#[tokio::test]
async fn web_failure_during_retry_keeps_original_answer() {
    let index = ScriptedIndex::with_scored(vec![scored("weak grounding", 0.5)]);
    let web = ScriptedWeb::failing();
    let generator = ScriptedGenerator::new(vec![
        Ok("I don't know the answer to that.".to_string()),
        Ok("A generated title".to_string()),
    ]);
    let (_dir, _store, service) = build_service(index, web, generator.clone());

    let chat = service.create_chat(None).unwrap();
    let reply = service
        .post_message(&chat.id, PostMessageRequest::from_content("what is foo?"))
        .await
        .unwrap();

    assert_eq!(reply.answer, "I don't know the answer to that.");
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.sources[0].source.as_deref(), Some("weak grounding.txt"));
    // Primary answer + title only; the retry generation never ran
    assert_eq!(generator.call_count(), 2);
}

/// A sentinel-titled chat gets a sanitized title after the first
/// exchange, and only then.
#[tokio::test]
async fn first_exchange_retitles_sentinel_chat() {
    let index = ScriptedIndex::with_scored(vec![scored("grounding", 0.2)]);
    let web = ScriptedWeb::failing();
    let generator = ScriptedGenerator::new(vec![
        Ok("An answer.".to_string()),
        Ok("  A   rather long generated title with many words.  ".to_string()),
        Ok("second answer".to_string()),
    ]);
    let (_dir, store, service) = build_service(index, web, generator.clone());

    let chat = service.create_chat(None).unwrap();
    let reply = service
        .post_message(&chat.id, PostMessageRequest::from_content("hello"))
        .await
        .unwrap();

    let title = reply.title.expect("retitling should fire");
    assert!(title.chars().count() <= 40);
    assert!(title.split(' ').count() <= 6);
    assert!(!title.ends_with(&['.', ',', ':', ';', '!', '-', ' '][..]));
    assert_eq!(store.chat(&chat.id).unwrap().unwrap().title, title);

    // A second exchange does not retitle again
    let second = service
        .post_message(&chat.id, PostMessageRequest::from_content("more"))
        .await
        .unwrap();
    assert!(second.title.is_none());
}

/// Posting to a nonexistent chat is NotFound and persists nothing.
#[tokio::test]
async fn unknown_chat_is_not_found_and_persists_nothing() {
    let index = ScriptedIndex::empty();
    let web = ScriptedWeb::failing();
    let generator = ScriptedGenerator::always("unused");
    let (_dir, store, service) = build_service(index, web, generator.clone());

    let result = service
        .post_message(
            "01ARZ3NDEKTSV4RRFFQ69G5FAV",
            PostMessageRequest::from_content("hello"),
        )
        .await;

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LorebookError>(),
        Some(LorebookError::ChatNotFound(_))
    ));
    assert!(store.messages("01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap().is_empty());
    assert_eq!(generator.call_count(), 0);
}

/// Local strategy failures degrade tier by tier before reaching the web.
#[tokio::test]
async fn degraded_tiers_before_web() {
    let index = std::sync::Arc::new(common::ScriptedIndex {
        scored: Err("scored down".to_string()),
        unscored: Err("unscored down".to_string()),
        generic: Ok(vec![Passage::new("generic hit", None)]),
    });
    let web = ScriptedWeb::with_results(vec![Passage::new("web", None)]);
    let engine = RetrievalEngine::new(index, web.clone());

    let result = engine.retrieve("q", 4).await;
    assert_eq!(result.origin, RetrievalOrigin::Local);
    assert_eq!(result.passages[0].content, "generic hit");
    assert_eq!(web.call_count(), 0);
}

/// A fully failed local chain still ends at the web, and a failed web
/// still yields an empty result rather than an error.
#[tokio::test]
async fn everything_failing_degrades_to_empty() {
    let index = std::sync::Arc::new(common::ScriptedIndex {
        scored: Err("down".to_string()),
        unscored: Err("down".to_string()),
        generic: Err("down".to_string()),
    });
    let web = ScriptedWeb::failing();
    let engine = RetrievalEngine::new(index, web);

    let result = engine.retrieve("q", 4).await;
    assert_eq!(result.origin, RetrievalOrigin::Empty);
    assert!(result.passages.is_empty());
}

/// With every retrieval layer down, the user still gets an answer.
#[tokio::test]
async fn message_answered_with_empty_context() {
    let index = std::sync::Arc::new(common::ScriptedIndex {
        scored: Err("down".to_string()),
        unscored: Err("down".to_string()),
        generic: Err("down".to_string()),
    });
    let web = ScriptedWeb::failing();
    let generator = ScriptedGenerator::always("I don't know");
    let (_dir, _store, service) = build_service(index, web, generator);

    let chat = service.create_chat(Some("Titled".to_string())).unwrap();
    let reply = service
        .post_message(&chat.id, PostMessageRequest::from_content("anything"))
        .await
        .unwrap();

    assert_eq!(reply.answer, "I don't know");
    assert!(reply.sources.is_empty());
}
