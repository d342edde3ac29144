//! End-to-end conversation turns against scripted models and in-process stores.

use std::sync::Arc;

use mnemo_ai::agent::{FALLBACK_APOLOGY, FUNCTION_LIMIT_DIRECTIVE, NO_RESPONSE_WARNING};
use mnemo_ai::retrieval::NO_RELEVANT_INFORMATION;
use mnemo_ai::tools::OutcomeStatus;
use mnemo_ai::{
    ChatConfig, ConversationOrchestrator, ConversationStore, InMemoryConversationStore,
    InMemoryRetrievalStore, MaintenanceStatus, MockLlmClient, MockStep, ModelGateway,
    RedbConversationStore, TurnPath,
};
use serde_json::{Value, json};
use tempfile::tempdir;

struct Harness {
    chat: MockLlmClient,
    summarizer: MockLlmClient,
    store: Arc<InMemoryConversationStore>,
    retrieval: Arc<InMemoryRetrievalStore>,
    orchestrator: ConversationOrchestrator,
}

async fn harness(chat_steps: Vec<MockStep>, summary_steps: Vec<MockStep>, config: ChatConfig) -> Harness {
    let chat = MockLlmClient::from_steps("mock-chat", chat_steps);
    let summarizer = MockLlmClient::from_steps("mock-summary", summary_steps);
    let gateway = ModelGateway::new(Arc::new(chat.clone())).with_summarizer(Arc::new(summarizer.clone()));
    let store = Arc::new(InMemoryConversationStore::new());
    let retrieval = Arc::new(InMemoryRetrievalStore::new());

    let orchestrator =
        ConversationOrchestrator::new(store.clone(), gateway, retrieval.clone(), config)
            .await
            .unwrap();

    Harness {
        chat,
        summarizer,
        store,
        retrieval,
        orchestrator,
    }
}

fn transcript_entries(json: &str) -> usize {
    serde_json::from_str::<Value>(json)
        .unwrap()
        .as_array()
        .map(Vec::len)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_profile_introduction_end_to_end() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(RedbConversationStore::open(temp_dir.path().join("mnemo.db")).unwrap());
    let chat = MockLlmClient::from_steps(
        "mock-chat",
        vec![
            MockStep::tool_call(
                "call_1",
                "add_user_info_to_database",
                json!({"user_info": {"name": "Alex", "interests": ["hiking", "biking"]}}),
            ),
            MockStep::text("Nice to meet you, Alex!"),
        ],
    );
    let retrieval = Arc::new(InMemoryRetrievalStore::new());
    let orchestrator = ConversationOrchestrator::new(
        store.clone(),
        ModelGateway::new(Arc::new(chat.clone())),
        retrieval.clone(),
        ChatConfig::default(),
    )
    .await
    .unwrap();

    let report = orchestrator
        .chat_detailed("My name is Alex and I like hiking, biking.")
        .await;

    assert_eq!(report.answer, "Nice to meet you, Alex!");
    assert_eq!(report.path, TurnPath::Direct);
    assert_eq!(report.tool_calls.len(), 1);
    assert_eq!(report.tool_calls[0].status, OutcomeStatus::Succeeded);

    let profile = store.load_profile().await.unwrap().unwrap();
    assert_eq!(profile.id, 1);
    assert_eq!(profile.name.as_deref(), Some("Alex"));
    assert_eq!(profile.interests.as_deref(), Some("biking, hiking"));

    let messages = store
        .recent_messages(orchestrator.default_session_id(), 10)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].user_id, Some(1));
    assert_eq!(retrieval.len(), 1);

    // The second call sees the refreshed profile and the success narrative.
    let requests = chat.requests().await;
    assert_eq!(requests.len(), 2);
    let second_prompt = &requests[1].messages[0].content;
    assert!(second_prompt.contains(r#""name":"Alex""#));
    assert!(second_prompt.contains("## Function Call Executed"));
    assert!(second_prompt.contains("User information updated."));
}

#[tokio::test]
async fn test_budget_exhaustion_omits_tools_and_falls_back() {
    let h = harness(
        vec![
            MockStep::tool_call("c1", "add_user_info_to_database", json!({"ssn": "123"})),
            MockStep::tool_call("c2", "add_user_info_to_database", json!({"ssn": "123"})),
            MockStep::text("I can only store basic profile details."),
        ],
        vec![],
        ChatConfig::default().with_max_function_calls(1),
    )
    .await;

    let report = h.orchestrator.chat_detailed("Save my SSN 123").await;

    assert_eq!(report.path, TurnPath::Fallback);
    assert_eq!(report.answer, "I can only store basic profile details.");
    assert_eq!(report.tool_calls.len(), 1);
    assert_eq!(report.tool_calls[0].status, OutcomeStatus::Failed);
    assert_eq!(report.summary, MaintenanceStatus::skipped("fallback turn"));

    let requests = h.chat.requests().await;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].tools.len(), 2);
    assert!(requests[1].tools.is_empty());
    assert!(requests[1].messages[0].content.ends_with(FUNCTION_LIMIT_DIRECTIVE));
    assert!(requests[2].tools.is_empty());

    assert!(h.store.load_profile().await.unwrap().is_none());
    assert_eq!(h.store.all_messages().len(), 1);
    assert_eq!(h.retrieval.len(), 1);
}

#[tokio::test]
async fn test_tool_after_success_falls_back_with_apology() {
    let h = harness(
        vec![
            MockStep::tool_call("c1", "search_vector_db", json!({"query": "favourite food"})),
            MockStep::tool_call("c2", "search_vector_db", json!({"query": "favourite food"})),
            MockStep::empty(),
        ],
        vec![],
        ChatConfig::default(),
    )
    .await;

    let report = h.orchestrator.chat_detailed("What is my favourite food?").await;

    assert_eq!(report.path, TurnPath::Fallback);
    assert_eq!(report.answer, FALLBACK_APOLOGY);
    assert_eq!(report.tool_names(), vec!["search_vector_db"]);

    let requests = h.chat.requests().await;
    assert_eq!(requests.len(), 3);
    assert!(requests[1].messages[0].content.contains(NO_RELEVANT_INFORMATION));
    assert_eq!(requests[1].tools.len(), 2);
    assert!(requests[2].tools.is_empty());

    assert_eq!(h.store.all_messages()[0].answer, FALLBACK_APOLOGY);
    assert_eq!(h.retrieval.len(), 1);
}

#[tokio::test]
async fn test_tool_count_never_exceeds_budget() {
    let looping: Vec<MockStep> = (0..10)
        .map(|i| MockStep::tool_call(format!("c{i}"), "add_user_info_to_database", json!({"bad": i})))
        .collect();
    let h = harness(looping, vec![], ChatConfig::default().with_max_function_calls(3)).await;

    let report = h.orchestrator.chat_detailed("Keep trying").await;

    assert_eq!(report.path, TurnPath::Fallback);
    assert_eq!(report.tool_calls.len(), 3);
    let requests = h.chat.requests().await;
    // 3 dispatched calls, the budget-spent call, and the fallback.
    assert_eq!(requests.len(), 5);
    assert!(requests[..3].iter().all(|r| r.tools.len() == 2));
    assert!(requests[3..].iter().all(|r| r.tools.is_empty()));
}

#[tokio::test]
async fn test_empty_reply_returns_warning_and_persists_nothing() {
    let h = harness(vec![MockStep::empty()], vec![], ChatConfig::default()).await;

    let report = h.orchestrator.chat_detailed("Hello?").await;

    assert_eq!(report.path, TurnPath::Warning);
    assert_eq!(report.answer, NO_RESPONSE_WARNING);
    assert!(h.store.all_messages().is_empty());
    assert!(h.retrieval.is_empty());
}

#[tokio::test]
async fn test_model_error_becomes_error_answer() {
    let h = harness(vec![MockStep::error("upstream unavailable")], vec![], ChatConfig::default()).await;

    let answer = h.orchestrator.chat("Hello").await;

    assert!(answer.starts_with("Error: "));
    assert!(answer.contains("upstream unavailable"));
    assert!(h.store.all_messages().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_is_reported_as_failure() {
    let h = harness(
        vec![
            MockStep::tool_call("c1", "launch_rockets", json!({"target": "moon"})),
            MockStep::text("I can't do that."),
        ],
        vec![],
        ChatConfig::default(),
    )
    .await;

    let report = h.orchestrator.chat_detailed("Launch the rockets").await;

    assert_eq!(report.path, TurnPath::Direct);
    assert_eq!(report.tool_names(), vec!["launch_rockets"]);
    assert_eq!(report.tool_calls[0].status, OutcomeStatus::Failed);

    let second_prompt = &h.chat.requests().await[1].messages[0].content;
    assert!(second_prompt.contains("`launch_rockets`"));
    assert!(second_prompt.contains("Function call failed. - Unknown function"));
}

#[tokio::test]
async fn test_summary_written_only_after_threshold_is_exceeded() {
    let h = harness(
        vec![
            MockStep::text("a1"),
            MockStep::text("a2"),
            MockStep::text("a3"),
            MockStep::text("a4"),
        ],
        vec![MockStep::text("The user greeted the assistant three times.")],
        ChatConfig::default().with_max_history_pairs(2),
    )
    .await;

    for (turn, question) in ["q1", "q2"].iter().enumerate() {
        let report = h.orchestrator.chat_detailed(question).await;
        assert!(
            matches!(report.summary, MaintenanceStatus::Skipped(_)),
            "turn {turn}"
        );
    }
    assert!(h.store.all_summaries().is_empty());
    assert_eq!(h.summarizer.request_count().await, 0);

    let third = h.orchestrator.chat_detailed("q3").await;
    assert!(third.summary.is_applied());
    assert_eq!(h.store.all_summaries().len(), 1);

    let summary_prompt = &h.summarizer.requests().await[0].messages[0].content;
    assert!(summary_prompt.contains("User: q1\nAssistant: a1"));
    assert!(summary_prompt.contains("User: q3\nAssistant: a3"));

    h.orchestrator.chat("q4").await;
    let fourth_prompt = &h.chat.requests().await[3].messages[0].content;
    assert!(fourth_prompt.contains("The user greeted the assistant three times."));
}

#[tokio::test]
async fn test_malformed_compaction_keeps_transcript() {
    let h = harness(
        vec![],
        vec![MockStep::text("Sorry, I cannot produce JSON today.")],
        ChatConfig::default()
            .with_max_history_pairs(4)
            .with_summary_threshold(100)
            .with_max_tokens(30),
    )
    .await;
    let session = h.orchestrator.default_session_id().to_string();

    let first = h
        .orchestrator
        .chat_detailed("Tell me something about mountains and rivers")
        .await;
    assert!(matches!(first.compaction, MaintenanceStatus::Skipped(_)));
    let before = h.orchestrator.transcript_json(&session).await.unwrap();

    let second = h
        .orchestrator
        .chat_detailed("Now tell me about oceans and deserts please")
        .await;
    assert!(second.compaction.is_degraded());

    let after = h.orchestrator.transcript_json(&session).await.unwrap();
    assert_eq!(transcript_entries(&after), 4);
    assert!(after.starts_with(&before[..before.len() - 1]));
}

#[tokio::test]
async fn test_compaction_rewrites_older_pairs() {
    let h = harness(
        vec![],
        vec![MockStep::text(r#"[{"user": "Asked about mountains"}, {"assistant": "Described mountains"}]"#)],
        ChatConfig::default()
            .with_max_history_pairs(4)
            .with_summary_threshold(100)
            .with_max_tokens(30),
    )
    .await;
    let session = h.orchestrator.default_session_id().to_string();

    h.orchestrator
        .chat("Tell me something about mountains and rivers")
        .await;
    let report = h
        .orchestrator
        .chat_detailed("Now tell me about oceans and deserts please")
        .await;
    assert!(report.compaction.is_applied());

    let transcript: Value =
        serde_json::from_str(&h.orchestrator.transcript_json(&session).await.unwrap()).unwrap();
    assert_eq!(transcript[0], json!({"user": "Asked about mountains"}));
    assert_eq!(
        transcript[2],
        json!({"user": "Now tell me about oceans and deserts please"})
    );

    let request = &h.summarizer.requests().await[0];
    assert_eq!(request.max_tokens, Some(300));
    assert!(!request.messages[0].content.contains("oceans"));
}

#[tokio::test]
async fn test_transcript_stays_even_and_bounded() {
    let h = harness(vec![], vec![], ChatConfig::default().with_max_history_pairs(2)).await;
    let session = h.orchestrator.default_session_id().to_string();

    for i in 0..7 {
        h.orchestrator.chat(&format!("message {i}")).await;
        let entries = transcript_entries(&h.orchestrator.transcript_json(&session).await.unwrap());
        assert_eq!(entries % 2, 0);
        assert!(entries <= 4);
    }
    assert_eq!(h.store.all_messages().len(), 7);
    assert_eq!(h.retrieval.len(), 7);
}

#[tokio::test]
async fn test_retrieval_finds_earlier_turns() {
    let h = harness(
        vec![
            MockStep::text("Rex sounds lovely!"),
            MockStep::tool_call("c1", "search_vector_db", json!({"query": "dog name"})),
            MockStep::text("Your dog is called Rex."),
            MockStep::text("Your dog is called Rex."),
        ],
        vec![],
        ChatConfig::default(),
    )
    .await;

    h.orchestrator.chat("My dog is named Rex").await;
    let report = h.orchestrator.chat_detailed("What is my dog's name?").await;

    assert_eq!(report.answer, "Your dog is called Rex.");
    assert_eq!(report.tool_calls[0].status, OutcomeStatus::Succeeded);

    let requests = h.chat.requests().await;
    // Chat, tool request, condensation (same client), answer.
    assert_eq!(requests.len(), 4);
    assert!(requests[2].messages[1].content.contains("user: My dog is named Rex"));
    assert!(requests[3].messages[0].content.contains("Your dog is called Rex."));
}
