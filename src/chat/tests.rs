use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use super::*;
use crate::api::{
    ApiResponse, ChatApi, ChatContext, ChatReply, CreateSessionRequest, MockChatApi,
    SendMessageRequest, UpdateSessionRequest, WireMessage,
};
use crate::constants::{APOLOGY_MESSAGE, LOAD_SESSION_ERROR};
use crate::session::{MemoryMessageCache, Message, MessageRole, Session, SessionStore};
use crate::utils::{CounselError, Result};

fn at(secs: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, secs).unwrap()
}

fn session(id: &str, title: &str) -> Session {
    Session {
        id: id.to_string(),
        title: title.to_string(),
        created_at: at(0),
        updated_at: at(0),
        user_id: None,
        message_count: None,
    }
}

fn reply(id: &str, content: &str, session_id: Option<&str>) -> ChatReply {
    ChatReply {
        id: id.to_string(),
        content: content.to_string(),
        role: MessageRole::Assistant,
        session_id: session_id.map(str::to_string),
        created_at: at(30),
        suggestions: Vec::new(),
        metadata: None,
    }
}

fn wire(id: &str, role: MessageRole, content: &str, secs: u32) -> WireMessage {
    WireMessage {
        id: id.to_string(),
        content: content.to_string(),
        role,
        created_at: at(secs),
        metadata: None,
    }
}

fn chat_with(api: impl ChatApi + 'static) -> (Chat, MemoryMessageCache) {
    let cache = MemoryMessageCache::new();
    let store = SessionStore::load(Box::new(cache.clone()), true);
    (Chat::new(Arc::new(api), store), cache)
}

fn cached(cache: &MemoryMessageCache) -> Vec<Message> {
    serde_json::from_str(&cache.snapshot().unwrap_or_else(|| "[]".to_string())).unwrap()
}

fn roles_and_content(messages: &[Message]) -> Vec<(MessageRole, String)> {
    messages
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect()
}

// ---- dispatcher ----

#[tokio::test]
async fn test_create_then_send_scenario() {
    let mut api = MockChatApi::new();
    api.expect_create_session()
        .times(1)
        .returning(|req| Ok(ApiResponse::ok(session("s1", &req.title))));
    api.expect_send_message().times(1).returning(|req| {
        assert_eq!(req.session_id.as_deref(), Some("s1"));
        Ok(ApiResponse::ok(reply("m1", "Focus on X,Y,Z", Some("s1"))))
    });

    let (chat, cache) = chat_with(api);
    chat.create_session(None).await.unwrap();
    let outcome = chat
        .send_message("What skills should I develop?", None)
        .await;

    assert!(outcome.is_delivered());
    assert_eq!(
        roles_and_content(&chat.messages()),
        vec![
            (MessageRole::User, "What skills should I develop?".to_string()),
            (MessageRole::Assistant, "Focus on X,Y,Z".to_string()),
        ]
    );
    assert_eq!(chat.messages()[1].id, "m1");
    assert_eq!(chat.active_session().unwrap().id, "s1");
    assert_eq!(cached(&cache), chat.messages());
    assert!(!chat.is_loading());
    assert!(chat.error().is_none());
}

#[tokio::test]
async fn test_each_successful_send_adds_two_messages() {
    let mut api = MockChatApi::new();
    let counter = Arc::new(Mutex::new(0u32));
    let seen = Arc::clone(&counter);
    api.expect_send_message().times(3).returning(move |req| {
        let mut n = seen.lock();
        *n += 1;
        Ok(ApiResponse::ok(reply(
            &format!("m{}", *n),
            &format!("re: {}", req.message),
            None,
        )))
    });

    let (chat, _cache) = chat_with(api);
    for (i, text) in ["one", "two", "three"].iter().enumerate() {
        chat.send_message(text, None).await;
        let messages = chat.messages();
        assert_eq!(messages.len(), 2 * (i + 1));
        assert_eq!(messages[2 * i].role, MessageRole::User);
        assert_eq!(messages[2 * i].content, *text);
        assert_eq!(messages[2 * i + 1].role, MessageRole::Assistant);
    }
}

#[tokio::test]
async fn test_blank_content_is_rejected_without_network() {
    // no expectations: any call would panic
    let (chat, cache) = chat_with(MockChatApi::new());

    assert_eq!(chat.send_message("", None).await, SendOutcome::Rejected);
    assert_eq!(chat.send_message("   \n\t", None).await, SendOutcome::Rejected);
    assert!(chat.messages().is_empty());
    assert!(cache.snapshot().is_none());
    assert!(chat.retry_context().is_none());
}

#[tokio::test]
async fn test_request_carries_context_and_current_page() {
    let captured: Arc<Mutex<Vec<SendMessageRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    let mut api = MockChatApi::new();
    api.expect_send_message().returning(move |req| {
        sink.lock().push(req.clone());
        Ok(ApiResponse::ok(reply("m1", "ok", None)))
    });

    let (chat, _cache) = chat_with(api);
    let chat = chat.with_current_page("/dashboard");
    let ctx = ChatContext::default().with_prompt("Prefers remote roles");
    chat.send_message("Any openings?", Some(ctx)).await;

    let requests = captured.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].session_id, None);
    let sent = requests[0].context.as_ref().unwrap();
    assert_eq!(sent.context_prompt.as_deref(), Some("Prefers remote roles"));
    assert_eq!(sent.current_page.as_deref(), Some("/dashboard"));
}

#[tokio::test]
async fn test_reply_session_is_adopted_when_none_active() {
    let mut api = MockChatApi::new();
    api.expect_send_message()
        .returning(|_| Ok(ApiResponse::ok(reply("m1", "Hello", Some("s7")))));
    api.expect_get_session().times(1).returning(|id| {
        assert_eq!(id, "s7");
        Ok(ApiResponse::ok(session("s7", "Career questions")))
    });
    api.expect_list_sessions()
        .times(1)
        .returning(|| Ok(ApiResponse::ok(vec![session("s7", "Career questions")])));

    let (chat, _cache) = chat_with(api);
    chat.send_message("Hi", None).await;

    assert_eq!(chat.active_session().unwrap().title, "Career questions");
    assert_eq!(chat.sessions().len(), 1);
    assert_eq!(chat.messages().len(), 2);
}

#[tokio::test]
async fn test_adoption_survives_session_fetch_failure() {
    let mut api = MockChatApi::new();
    api.expect_send_message()
        .returning(|_| Ok(ApiResponse::ok(reply("m1", "Hello", Some("s8")))));
    api.expect_get_session()
        .returning(|_| Ok(ApiResponse::failure("not found")));
    api.expect_list_sessions()
        .returning(|| Err(CounselError::NetworkError("offline".to_string())));

    let (chat, _cache) = chat_with(api);
    assert!(chat.send_message("Hi", None).await.is_delivered());
    assert_eq!(chat.active_session().unwrap().id, "s8");
    assert!(chat.error().is_none());
}

#[tokio::test]
async fn test_suggestions_follow_latest_reply() {
    let mut api = MockChatApi::new();
    api.expect_send_message().returning(|_| {
        let mut r = reply("m1", "Consider data analytics", None);
        r.suggestions = vec!["What tools do analysts use?".to_string()];
        Ok(ApiResponse::ok(r))
    });

    let (chat, _cache) = chat_with(api);
    chat.send_message("What fits me?", None).await;
    assert_eq!(chat.suggestions(), vec!["What tools do analysts use?".to_string()]);
}

#[tokio::test]
async fn test_backend_failure_appends_apology() {
    let mut api = MockChatApi::new();
    api.expect_send_message()
        .times(1)
        .returning(|_| Ok(ApiResponse::failure("rate limited")));

    let (chat, cache) = chat_with(api);
    let outcome = chat.send_message("Help me plan", None).await;

    assert_eq!(outcome, SendOutcome::Failed("API error: rate limited".to_string()));
    assert_eq!(
        roles_and_content(&chat.messages()),
        vec![
            (MessageRole::User, "Help me plan".to_string()),
            (MessageRole::Assistant, APOLOGY_MESSAGE.to_string()),
        ]
    );
    assert!(chat.error().unwrap().contains("try again"));
    assert_eq!(cached(&cache).len(), 2);
    assert!(!chat.is_loading());
}

#[tokio::test]
async fn test_transport_failure_appends_apology() {
    let mut api = MockChatApi::new();
    api.expect_send_message()
        .returning(|_| Err(CounselError::NetworkError("connection refused".to_string())));

    let (chat, _cache) = chat_with(api);
    assert!(matches!(
        chat.send_message("Hello?", None).await,
        SendOutcome::Failed(_)
    ));
    assert_eq!(chat.messages().len(), 2);
    assert!(chat.error().is_some());
}

#[tokio::test]
async fn test_successful_send_clears_previous_error() {
    let mut api = MockChatApi::new();
    let mut seq = mockall::Sequence::new();
    api.expect_send_message()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ApiResponse::failure("busy")));
    api.expect_send_message()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ApiResponse::ok(reply("m2", "Here you go", None))));

    let (chat, _cache) = chat_with(api);
    chat.send_message("first", None).await;
    assert!(chat.error().is_some());
    chat.send_message("second", None).await;
    assert!(chat.error().is_none());
}

// ---- retry ----

#[tokio::test]
async fn test_retry_resubmits_exact_content_and_context() {
    let captured: Arc<Mutex<Vec<SendMessageRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    let mut api = MockChatApi::new();
    api.expect_send_message().times(2).returning(move |req| {
        sink.lock().push(req.clone());
        Ok(ApiResponse::failure("rate limited"))
    });

    let (chat, _cache) = chat_with(api);
    let ctx = ChatContext::default().with_prompt("Senior engineer");
    chat.send_message("Should I become a manager?", Some(ctx.clone()))
        .await;
    let first = chat.retry_context().unwrap();

    assert!(matches!(chat.retry().await, SendOutcome::Failed(_)));

    let requests = captured.lock();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
    assert_eq!(requests[1].message, "Should I become a manager?");

    // the record is replaced, not accumulated
    assert_eq!(chat.retry_context().unwrap(), first);
    assert_eq!(first.context, Some(ctx));
    // user message + apology, twice
    assert_eq!(chat.messages().len(), 4);
}

#[tokio::test]
async fn test_retry_with_nothing_sent_is_noop() {
    let (chat, _cache) = chat_with(MockChatApi::new());
    assert_eq!(chat.retry().await, SendOutcome::Rejected);
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn test_retry_record_sticks_after_success() {
    let mut api = MockChatApi::new();
    api.expect_send_message()
        .returning(|_| Ok(ApiResponse::ok(reply("m1", "Sure", None))));

    let (chat, _cache) = chat_with(api);
    chat.send_message("Tell me more", None).await;
    assert_eq!(chat.retry_context().unwrap().content, "Tell me more");
}

// ---- session directory ----

fn history_api(id: &'static str) -> MockChatApi {
    let mut api = MockChatApi::new();
    api.expect_get_session()
        .returning(move |_| Ok(ApiResponse::ok(session(id, "History"))));
    api.expect_get_session_messages().returning(|_| {
        Ok(ApiResponse::ok(vec![
            wire("a1", MessageRole::User, "Is a bootcamp worth it?", 1),
            wire("a2", MessageRole::Assistant, "It depends on your goals.", 2),
        ]))
    });
    api
}

#[tokio::test]
async fn test_switch_loads_history_and_mirrors_cache() {
    let (chat, cache) = chat_with(history_api("s2"));
    chat.switch_session("s2").await.unwrap();

    assert_eq!(chat.active_session().unwrap().id, "s2");
    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, "a1");
    assert_eq!(messages[1].timestamp, at(2));
    assert_eq!(cached(&cache), messages);
}

#[tokio::test]
async fn test_switch_twice_is_idempotent() {
    let (chat, _cache) = chat_with(history_api("s2"));
    chat.switch_session("s2").await.unwrap();
    let once = chat.messages();
    chat.switch_session("s2").await.unwrap();
    assert_eq!(chat.messages(), once);
    assert_eq!(chat.active_session().unwrap().id, "s2");
}

#[tokio::test]
async fn test_switch_failure_keeps_current_session() {
    let mut api = MockChatApi::new();
    api.expect_create_session()
        .returning(|_| Ok(ApiResponse::ok(session("s1", "Current"))));
    api.expect_get_session()
        .returning(|_| Err(CounselError::NetworkError("timeout".to_string())));
    api.expect_get_session_messages()
        .returning(|_| Ok(ApiResponse::ok(Vec::new())));

    let (chat, _cache) = chat_with(api);
    chat.create_session(Some("Current")).await.unwrap();
    assert!(chat.switch_session("s9").await.is_err());

    assert_eq!(chat.active_session().unwrap().id, "s1");
    assert_eq!(chat.error().as_deref(), Some(LOAD_SESSION_ERROR));
}

#[tokio::test]
async fn test_create_resets_messages_and_puts_session_first() {
    let mut api = MockChatApi::new();
    api.expect_list_sessions()
        .returning(|| Ok(ApiResponse::ok(vec![session("old", "Old chat")])));
    api.expect_send_message()
        .returning(|_| Ok(ApiResponse::ok(reply("m1", "Hi", None))));
    api.expect_create_session().returning(|req: &CreateSessionRequest| {
        assert_eq!(req.title, "New Conversation");
        Ok(ApiResponse::ok(session("new", &req.title)))
    });

    let (chat, cache) = chat_with(api);
    chat.refresh_sessions().await.unwrap();
    chat.send_message("Hello", None).await;
    assert_eq!(chat.messages().len(), 2);

    chat.create_session(Some("   ")).await.unwrap();
    assert!(chat.messages().is_empty());
    assert!(cached(&cache).is_empty());
    let ids: Vec<String> = chat.sessions().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
}

#[tokio::test]
async fn test_create_failure_propagates() {
    let mut api = MockChatApi::new();
    api.expect_create_session()
        .returning(|_| Ok(ApiResponse::failure("quota reached")));

    let (chat, _cache) = chat_with(api);
    let err = chat.create_session(Some("Plan")).await.unwrap_err();
    assert!(matches!(err, CounselError::ApiError(msg) if msg == "quota reached"));
    assert!(chat.active_session().is_none());
}

#[tokio::test]
async fn test_refresh_failure_keeps_previous_listing() {
    let mut api = MockChatApi::new();
    let mut seq = mockall::Sequence::new();
    api.expect_list_sessions()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(ApiResponse::ok(vec![session("s1", "One"), session("s2", "Two")])));
    api.expect_list_sessions()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(ApiResponse::failure("server error")));

    let (chat, _cache) = chat_with(api);
    chat.refresh_sessions().await.unwrap();
    assert!(chat.refresh_sessions().await.is_err());
    assert_eq!(chat.sessions().len(), 2);
}

#[tokio::test]
async fn test_delete_active_session_clears_conversation() {
    let mut api = history_api("s2");
    api.expect_list_sessions()
        .returning(|| Ok(ApiResponse::ok(vec![session("s2", "History")])));
    api.expect_delete_session()
        .returning(|_| Ok(ApiResponse::ok(serde_json::json!({ "deleted": true }))));

    let (chat, cache) = chat_with(api);
    chat.refresh_sessions().await.unwrap();
    chat.switch_session("s2").await.unwrap();
    chat.delete_session("s2").await.unwrap();

    assert!(chat.active_session().is_none());
    assert!(chat.messages().is_empty());
    assert!(chat.sessions().is_empty());
    assert!(cache.snapshot().is_none());
}

#[tokio::test]
async fn test_delete_other_session_leaves_active_untouched() {
    let mut api = history_api("s2");
    api.expect_list_sessions().returning(|| {
        Ok(ApiResponse::ok(vec![session("s2", "History"), session("s3", "Other")]))
    });
    api.expect_delete_session()
        .returning(|_| Ok(ApiResponse::ok(serde_json::Value::Null)));

    let (chat, _cache) = chat_with(api);
    chat.refresh_sessions().await.unwrap();
    chat.switch_session("s2").await.unwrap();
    let before = chat.messages();

    chat.delete_session("s3").await.unwrap();
    assert_eq!(chat.active_session().unwrap().id, "s2");
    assert_eq!(chat.messages(), before);
    assert_eq!(chat.sessions().len(), 1);
}

#[tokio::test]
async fn test_rename_updates_listing_and_active() {
    let mut api = history_api("s2");
    api.expect_list_sessions()
        .returning(|| Ok(ApiResponse::ok(vec![session("s2", "History")])));
    api.expect_update_session()
        .returning(|id, req: &UpdateSessionRequest| {
            Ok(ApiResponse::ok(session(id, req.title.as_deref().unwrap_or_default())))
        });

    let (chat, _cache) = chat_with(api);
    chat.refresh_sessions().await.unwrap();
    chat.switch_session("s2").await.unwrap();
    chat.rename_session("s2", "Bootcamp research").await.unwrap();

    assert_eq!(chat.sessions()[0].title, "Bootcamp research");
    assert_eq!(chat.active_session().unwrap().title, "Bootcamp research");
}

#[tokio::test]
async fn test_cached_messages_restored_on_start() {
    let messages = vec![Message::new("c1", MessageRole::User, "cached", at(5))];
    let cache = MemoryMessageCache::with_payload(serde_json::to_string(&messages).unwrap());
    let store = SessionStore::load(Box::new(cache), true);
    let chat = Chat::new(Arc::new(MockChatApi::new()), store);
    assert_eq!(chat.messages(), messages);
}

// ---- in-flight handling ----

/// Backend whose message endpoint never answers
struct StallingApi;

#[async_trait]
impl ChatApi for StallingApi {
    async fn send_message(&self, _request: &SendMessageRequest) -> Result<ApiResponse<ChatReply>> {
        std::future::pending().await
    }

    async fn list_sessions(&self) -> Result<ApiResponse<Vec<Session>>> {
        Ok(ApiResponse::ok(Vec::new()))
    }

    async fn get_session(&self, id: &str) -> Result<ApiResponse<Session>> {
        Ok(ApiResponse::ok(session(id, "Other")))
    }

    async fn get_session_messages(&self, _id: &str) -> Result<ApiResponse<Vec<WireMessage>>> {
        Ok(ApiResponse::ok(vec![wire("o1", MessageRole::User, "other", 1)]))
    }

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<ApiResponse<Session>> {
        Ok(ApiResponse::ok(session("fresh", &request.title)))
    }

    async fn update_session(
        &self,
        id: &str,
        _request: &UpdateSessionRequest,
    ) -> Result<ApiResponse<Session>> {
        Ok(ApiResponse::ok(session(id, "Renamed")))
    }

    async fn delete_session(&self, _id: &str) -> Result<ApiResponse<serde_json::Value>> {
        Ok(ApiResponse::ok(serde_json::Value::Null))
    }
}

async fn wait_until_loading(chat: &Chat) {
    while !chat.is_loading() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_second_send_rejected_while_in_flight() {
    let (chat, _cache) = chat_with(StallingApi);
    let chat = Arc::new(chat);

    let pending = tokio::spawn({
        let chat = Arc::clone(&chat);
        async move { chat.send_message("first", None).await }
    });
    wait_until_loading(&chat).await;

    assert_eq!(chat.send_message("second", None).await, SendOutcome::Rejected);
    assert_eq!(chat.messages().len(), 1);

    chat.clear_messages();
    assert_eq!(pending.await.unwrap(), SendOutcome::Cancelled);
    assert!(!chat.is_loading());
}

#[tokio::test]
async fn test_switch_cancels_in_flight_send() {
    let (chat, _cache) = chat_with(StallingApi);
    let chat = Arc::new(chat);

    let pending = tokio::spawn({
        let chat = Arc::clone(&chat);
        async move { chat.send_message("lost in transit", None).await }
    });
    wait_until_loading(&chat).await;

    chat.switch_session("s5").await.unwrap();
    assert_eq!(pending.await.unwrap(), SendOutcome::Cancelled);

    // nothing from the abandoned send leaks into the new session
    let messages = chat.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "o1");
    assert!(chat.error().is_none());
    assert!(!chat.is_loading());
}

#[tokio::test]
async fn test_dropped_send_releases_loading_flag() {
    let (chat, _cache) = chat_with(StallingApi);

    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        chat.send_message("first", None),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(!chat.is_loading());

    // the user message from the abandoned send stays visible
    assert_eq!(chat.messages().len(), 1);

    // a later send is accepted rather than rejected
    let second = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        chat.send_message("second", None),
    )
    .await;
    assert!(second.is_err());
    assert_eq!(chat.messages().len(), 2);
    assert!(!chat.is_loading());
}

#[tokio::test]
async fn test_reply_with_repeated_id_is_discarded() {
    let mut api = MockChatApi::new();
    let mut seq = mockall::Sequence::new();
    api.expect_send_message()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            let mut r = reply("m1", "Start with informational interviews", None);
            r.suggestions = vec!["Who should I contact?".to_string()];
            Ok(ApiResponse::ok(r))
        });
    api.expect_send_message()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            let mut r = reply("m1", "Same id again", None);
            r.suggestions = vec!["Ignored".to_string()];
            Ok(ApiResponse::ok(r))
        });

    let (chat, cache) = chat_with(api);
    assert!(chat.send_message("How do I network?", None).await.is_delivered());
    let outcome = chat.send_message("And after that?", None).await;

    assert_eq!(outcome, SendOutcome::Discarded("m1".to_string()));
    assert_eq!(
        roles_and_content(&chat.messages()),
        vec![
            (MessageRole::User, "How do I network?".to_string()),
            (
                MessageRole::Assistant,
                "Start with informational interviews".to_string()
            ),
            (MessageRole::User, "And after that?".to_string()),
        ]
    );
    assert_eq!(chat.suggestions(), vec!["Who should I contact?".to_string()]);
    assert_eq!(cached(&cache), chat.messages());
    assert!(!chat.is_loading());
}
