use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::stream;
use tokio::sync::mpsc;

use lexchat_chat::{
    ChatEvent, ChatSession, TurnError, EMPTY_RESPONSE_NOTICE, SIGN_IN_NOTICE,
    TRANSPORT_FAILURE_MESSAGE,
};
use lexchat_llm::{parse_sse_stream, ChatClient, ChatRequest, EventStream, Role};
use lexchat_persist::{
    Bookmark, Conversation, ConversationGateway, InMemoryPersistenceClient, PersistError,
    PersistenceClient, Principal, SessionAuth, StoredMessage,
};

type Chunk = std::result::Result<Vec<u8>, std::io::Error>;

fn sse_body(deltas: &[&str], done: bool) -> Vec<u8> {
    let mut out = String::from(": stream opened\n\n");
    for delta in deltas {
        out.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "index": 0, "delta": { "content": delta } }] })
        ));
    }
    if done {
        out.push_str("data: [DONE]\n\n");
    }
    out.into_bytes()
}

/// Replays one canned SSE body per call, split into small chunks
struct ScriptedClient {
    bodies: Mutex<Vec<Vec<u8>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    fn new(bodies: Vec<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            bodies: Mutex::new(bodies),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        self.requests.lock().unwrap().push(request);
        let body = {
            let mut bodies = self.bodies.lock().unwrap();
            anyhow::ensure!(!bodies.is_empty(), "no scripted response left");
            bodies.remove(0)
        };
        let chunks: Vec<Chunk> = body.chunks(5).map(|c| Ok(c.to_vec())).collect();
        Ok(parse_sse_stream(stream::iter(chunks)))
    }
}

/// Streams whatever the test pushes through its sender
struct GatedClient {
    source: Mutex<Option<UnboundedReceiver<Chunk>>>,
}

impl GatedClient {
    fn new() -> (Arc<Self>, UnboundedSender<Chunk>) {
        let (tx, rx) = unbounded();
        (
            Arc::new(Self {
                source: Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait]
impl ChatClient for GatedClient {
    async fn chat_stream(&self, _request: ChatRequest) -> Result<EventStream> {
        let source = self.source.lock().unwrap().take();
        let source = source.ok_or_else(|| anyhow::anyhow!("stream already taken"))?;
        Ok(parse_sse_stream(source))
    }
}

/// Creates conversations but refuses to store assistant messages
struct NoAssistantStore {
    inner: InMemoryPersistenceClient,
}

#[async_trait]
impl PersistenceClient for NoAssistantStore {
    fn backend_name(&self) -> &'static str {
        "no-assistant"
    }

    async fn create_conversation(&self, user_id: &str, title: String) -> lexchat_persist::Result<Conversation> {
        self.inner.create_conversation(user_id, title).await
    }

    async fn get_conversation(&self, id: &str, user_id: &str) -> lexchat_persist::Result<Option<Conversation>> {
        self.inner.get_conversation(id, user_id).await
    }

    async fn list_conversations(&self, user_id: &str, limit: i64) -> lexchat_persist::Result<Vec<Conversation>> {
        self.inner.list_conversations(user_id, limit).await
    }

    async fn save_message(&self, user_id: &str, message: StoredMessage) -> lexchat_persist::Result<()> {
        if message.role == Role::Assistant {
            return Err(PersistError::Connection("write timed out".to_string()));
        }
        self.inner.save_message(user_id, message).await
    }

    async fn get_messages(&self, user_id: &str, id: &str) -> lexchat_persist::Result<Vec<StoredMessage>> {
        self.inner.get_messages(user_id, id).await
    }

    async fn save_bookmark(&self, bookmark: Bookmark) -> lexchat_persist::Result<()> {
        self.inner.save_bookmark(bookmark).await
    }

    async fn list_bookmarks(&self, user_id: &str) -> lexchat_persist::Result<Vec<Bookmark>> {
        self.inner.list_bookmarks(user_id).await
    }

    async fn delete_bookmark(&self, id: &str, user_id: &str) -> lexchat_persist::Result<bool> {
        self.inner.delete_bookmark(id, user_id).await
    }
}

fn session_with(
    client: Arc<dyn ChatClient>,
    store: Arc<dyn PersistenceClient>,
    user: Option<&str>,
) -> (Arc<ChatSession>, Arc<SessionAuth>) {
    let auth = Arc::new(match user {
        Some(id) => SessionAuth::signed_in(Principal::new(id)),
        None => SessionAuth::new(),
    });
    let gateway = ConversationGateway::new(store, auth.clone());
    (Arc::new(ChatSession::new(client, gateway)), auth)
}

async fn drain(mut rx: mpsc::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_signed_in_turn_streams_and_persists() {
    let deltas = ["You have ", "the right ", "to remain silent ", "and to an attorney."];
    let client = ScriptedClient::new(vec![sse_body(&deltas, true)]);
    let (session, _auth) = session_with(
        client.clone(),
        Arc::new(InMemoryPersistenceClient::new()),
        Some("alice"),
    );

    let events = drain(session.spawn_turn("What are my rights?").unwrap()).await;

    let conversation_id = match &events[0] {
        ChatEvent::Conversation { conversation_id } => conversation_id.clone(),
        other => panic!("expected conversation event, got {:?}", other),
    };

    let snapshots: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Snapshot { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(snapshots.len(), deltas.len());
    assert!(snapshots.windows(2).all(|w| w[1].starts_with(w[0])));

    let full = deltas.concat();
    assert_eq!(
        events.last(),
        Some(&ChatEvent::Completed {
            content: full.clone(),
            persisted: true,
        })
    );
    assert!(!events.iter().any(|e| matches!(e, ChatEvent::Notice { .. })));

    let gateway = session.gateway();
    assert_eq!(
        gateway.get_conversation(&conversation_id).await.unwrap().title,
        "What are my rights?"
    );
    let transcript = gateway.load_transcript(&conversation_id).await.unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, Role::User);
    assert_eq!(transcript[0].content, "What are my rights?");
    assert_eq!(transcript[1].role, Role::Assistant);
    assert_eq!(transcript[1].content, full);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.conversation_id.as_deref(), Some(conversation_id.as_str()));
    assert_eq!(snapshot.messages.len(), 2);
    assert!(snapshot.streaming.is_none());
    assert!(!snapshot.is_loading);

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].content, "What are my rights?");
}

#[tokio::test]
async fn test_follow_up_sends_full_history_to_same_conversation() {
    let client = ScriptedClient::new(vec![
        sse_body(&["Usually 30 days."], true),
        sse_body(&["Yes, in writing."], true),
    ]);
    let (session, _auth) = session_with(
        client.clone(),
        Arc::new(InMemoryPersistenceClient::new()),
        Some("alice"),
    );
    let (tx, _rx) = mpsc::channel(64);

    let first = session.send("How long to return a deposit?", &tx).await.unwrap();
    let second = session.send("Must they itemize deductions?", &tx).await.unwrap();

    assert!(first.conversation_id.is_some());
    assert_eq!(first.conversation_id, second.conversation_id);

    let requests = client.requests();
    let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);

    let id = second.conversation_id.unwrap();
    let transcript = session.gateway().load_transcript(&id).await.unwrap();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[3].content, "Yes, in writing.");
}

#[tokio::test]
async fn test_anonymous_session_gets_sign_in_notice_once() {
    let client = ScriptedClient::new(vec![sse_body(&["First."], true), sse_body(&["Second."], true)]);
    let (session, _auth) = session_with(client, Arc::new(InMemoryPersistenceClient::new()), None);

    let first = drain(session.spawn_turn("hello").unwrap()).await;
    let second = drain(session.spawn_turn("again").unwrap()).await;

    assert_eq!(
        first[0],
        ChatEvent::Notice {
            message: SIGN_IN_NOTICE.to_string()
        }
    );
    assert!(!second.iter().any(|e| matches!(e, ChatEvent::Notice { .. })));
    assert!(!first.iter().any(|e| matches!(e, ChatEvent::Conversation { .. })));
    assert_eq!(
        second.last(),
        Some(&ChatEvent::Completed {
            content: "Second.".to_string(),
            persisted: false,
        })
    );
    assert_eq!(session.snapshot().messages.len(), 4);
}

#[tokio::test]
async fn test_assistant_save_failure_still_completes() {
    let client = ScriptedClient::new(vec![sse_body(&["Answer."], true)]);
    let store = Arc::new(NoAssistantStore {
        inner: InMemoryPersistenceClient::new(),
    });
    let (session, _auth) = session_with(client, store, Some("alice"));
    let (tx, rx) = mpsc::channel(64);

    let outcome = session.send("question", &tx).await.unwrap();
    drop(tx);
    let events = drain(rx).await;

    assert_eq!(outcome.reply.as_deref(), Some("Answer."));
    assert!(!outcome.persisted);
    assert_eq!(
        events.last(),
        Some(&ChatEvent::Completed {
            content: "Answer.".to_string(),
            persisted: false,
        })
    );
    assert_eq!(session.snapshot().messages.len(), 2);
}

#[tokio::test]
async fn test_stream_without_done_aborts_turn() {
    let client = ScriptedClient::new(vec![sse_body(&["Partial ", "answer"], false)]);
    let (session, _auth) = session_with(
        client,
        Arc::new(InMemoryPersistenceClient::new()),
        Some("alice"),
    );
    let (tx, rx) = mpsc::channel(64);

    let result = session.send("question", &tx).await;
    drop(tx);
    let events = drain(rx).await;

    assert!(matches!(result, Err(TurnError::Transport(_))));
    assert_eq!(
        events.last(),
        Some(&ChatEvent::Error {
            message: TRANSPORT_FAILURE_MESSAGE.to_string()
        })
    );

    let snapshot = session.snapshot();
    assert!(snapshot.streaming.is_none());
    assert!(!snapshot.is_loading);
    let roles: Vec<Role> = snapshot.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User]);

    let id = snapshot.conversation_id.unwrap();
    let transcript = session.gateway().load_transcript(&id).await.unwrap();
    assert_eq!(transcript.len(), 1);
}

#[tokio::test]
async fn test_done_without_content_is_a_notice() {
    let client = ScriptedClient::new(vec![sse_body(&[], true)]);
    let (session, _auth) = session_with(
        client,
        Arc::new(InMemoryPersistenceClient::new()),
        Some("alice"),
    );
    let (tx, rx) = mpsc::channel(64);

    let outcome = session.send("anyone there?", &tx).await.unwrap();
    drop(tx);
    let events = drain(rx).await;

    assert!(outcome.reply.is_none());
    assert_eq!(
        events.last(),
        Some(&ChatEvent::Notice {
            message: EMPTY_RESPONSE_NOTICE.to_string()
        })
    );
    let id = outcome.conversation_id.unwrap();
    assert_eq!(session.gateway().load_transcript(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_send_while_streaming_is_busy() {
    let (client, feed) = GatedClient::new();
    let (session, _auth) = session_with(client, Arc::new(InMemoryPersistenceClient::new()), None);

    let mut rx = session.spawn_turn("first").unwrap();
    assert!(session.is_loading());
    assert!(matches!(session.spawn_turn("second"), Err(TurnError::Busy)));
    assert!(matches!(session.start_new_conversation(), Err(TurnError::Busy)));

    // Sign-in notice, then the first snapshot once a delta arrives.
    assert!(matches!(rx.recv().await, Some(ChatEvent::Notice { .. })));
    feed.unbounded_send(Ok(sse_body(&["Half"], false))).unwrap();
    assert_eq!(
        rx.recv().await,
        Some(ChatEvent::Snapshot {
            content: "Half".to_string()
        })
    );
    assert_eq!(session.snapshot().streaming.as_deref(), Some("Half"));
    assert!(matches!(session.spawn_turn("third"), Err(TurnError::Busy)));

    feed.unbounded_send(Ok(sse_body(&[" done."], true))).unwrap();
    let rest = drain(rx).await;
    assert_eq!(
        rest.last(),
        Some(&ChatEvent::Completed {
            content: "Half done.".to_string(),
            persisted: false,
        })
    );
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let client = ScriptedClient::new(Vec::new());
    let (session, _auth) = session_with(client.clone(), Arc::new(InMemoryPersistenceClient::new()), None);

    assert!(matches!(session.spawn_turn("   \n"), Err(TurnError::EmptyMessage)));
    assert!(!session.is_loading());
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_dropped_consumer_abandons_turn() {
    let client = ScriptedClient::new(vec![sse_body(&["never ", "seen"], true)]);
    let (session, _auth) = session_with(
        client,
        Arc::new(InMemoryPersistenceClient::new()),
        Some("alice"),
    );
    let (tx, rx) = mpsc::channel(64);
    drop(rx);

    let result = session.send("question", &tx).await;

    assert!(matches!(result, Err(TurnError::Abandoned)));
    let snapshot = session.snapshot();
    assert!(!snapshot.is_loading);
    assert!(snapshot.streaming.is_none());
    let id = snapshot.conversation_id.unwrap();
    assert_eq!(session.gateway().load_transcript(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_resume_hydrates_transcript() {
    let store: Arc<dyn PersistenceClient> = Arc::new(InMemoryPersistenceClient::new());
    let client = ScriptedClient::new(vec![sse_body(&["A tenant may withhold rent only in some states."], true)]);

    let (writer, _auth) = session_with(client, store.clone(), Some("alice"));
    let (tx, _rx) = mpsc::channel(64);
    let outcome = writer.send("Can I withhold rent?", &tx).await.unwrap();
    let id = outcome.conversation_id.unwrap();

    let (reader, _auth) = session_with(ScriptedClient::new(Vec::new()), store, Some("alice"));
    reader.resume(&id).await.unwrap();

    let snapshot = reader.snapshot();
    assert_eq!(snapshot.conversation_id.as_deref(), Some(id.as_str()));
    assert_eq!(snapshot.messages, writer.snapshot().messages);
}

#[tokio::test]
async fn test_resume_of_foreign_conversation_fails() {
    let store: Arc<dyn PersistenceClient> = Arc::new(InMemoryPersistenceClient::new());
    let (owner, _auth) = session_with(
        ScriptedClient::new(vec![sse_body(&["ok"], true)]),
        store.clone(),
        Some("alice"),
    );
    let (tx, _rx) = mpsc::channel(64);
    let id = owner.send("mine", &tx).await.unwrap().conversation_id.unwrap();

    let (intruder, _auth) = session_with(ScriptedClient::new(Vec::new()), store, Some("mallory"));

    assert!(matches!(
        intruder.resume(&id).await,
        Err(TurnError::Persist(PersistError::Forbidden(_)))
    ));
    assert!(intruder.snapshot().conversation_id.is_none());
}

#[tokio::test]
async fn test_sign_out_clears_open_conversation() {
    let client = ScriptedClient::new(vec![sse_body(&["one"], true), sse_body(&["two"], true)]);
    let (session, auth) = session_with(
        client.clone(),
        Arc::new(InMemoryPersistenceClient::new()),
        Some("alice"),
    );
    let (tx, rx) = mpsc::channel(64);
    session.send("first", &tx).await.unwrap();

    auth.sign_out();
    let outcome = session.send("second", &tx).await.unwrap();
    drop(tx);
    let events = drain(rx).await;

    assert!(outcome.conversation_id.is_none());
    assert!(events.contains(&ChatEvent::Notice {
        message: SIGN_IN_NOTICE.to_string()
    }));
    let requests = client.requests();
    assert_eq!(requests[1].messages.len(), 1);
    assert_eq!(requests[1].messages[0].content, "second");
}

#[tokio::test]
async fn test_sign_in_keeps_anonymous_messages() {
    let client = ScriptedClient::new(vec![sse_body(&["one"], true), sse_body(&["two"], true)]);
    let (session, auth) = session_with(client, Arc::new(InMemoryPersistenceClient::new()), None);
    let (tx, _rx) = mpsc::channel(64);
    session.send("before", &tx).await.unwrap();

    auth.sign_in(Principal::new("alice"));
    let outcome = session.send("after", &tx).await.unwrap();

    assert!(outcome.persisted);
    assert_eq!(session.snapshot().messages.len(), 4);
    let id = outcome.conversation_id.unwrap();
    let transcript = session.gateway().load_transcript(&id).await.unwrap();
    assert_eq!(transcript[0].content, "after");
}

#[tokio::test]
async fn test_principal_switch_mid_stream_hides_reply() {
    let store: Arc<dyn PersistenceClient> = Arc::new(InMemoryPersistenceClient::new());
    let (client, feed) = GatedClient::new();
    let (session, auth) = session_with(client, store.clone(), Some("alice"));

    let mut rx = session.spawn_turn("Can I break my lease early?").unwrap();
    let conversation_id = match rx.recv().await {
        Some(ChatEvent::Conversation { conversation_id }) => conversation_id,
        other => panic!("expected conversation event, got {:?}", other),
    };
    feed.unbounded_send(Ok(sse_body(&["Alice secret answer"], false))).unwrap();
    assert!(matches!(rx.recv().await, Some(ChatEvent::Snapshot { .. })));

    auth.sign_in(Principal::new("bob"));
    let during = session.snapshot();
    assert!(during.conversation_id.is_none());
    assert!(during.messages.is_empty());
    assert!(during.streaming.is_none());

    feed.unbounded_send(Ok(sse_body(&[], true))).unwrap();
    let rest = drain(rx).await;
    assert_eq!(
        rest.last(),
        Some(&ChatEvent::Completed {
            content: "Alice secret answer".to_string(),
            persisted: true,
        })
    );

    let after = session.snapshot();
    assert!(after.messages.is_empty());
    assert!(after.streaming.is_none());
    assert!(after.conversation_id.is_none());

    // The reply still lands in alice's own conversation.
    let alice = ConversationGateway::new(
        store,
        Arc::new(SessionAuth::signed_in(Principal::new("alice"))),
    );
    let transcript = alice.load_transcript(&conversation_id).await.unwrap();
    let roles: Vec<Role> = transcript.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(transcript[1].content, "Alice secret answer");
}

#[tokio::test]
async fn test_start_new_conversation_resets_state() {
    let client = ScriptedClient::new(vec![sse_body(&["one"], true), sse_body(&["two"], true)]);
    let (session, _auth) = session_with(
        client,
        Arc::new(InMemoryPersistenceClient::new()),
        Some("alice"),
    );
    let (tx, _rx) = mpsc::channel(64);
    let first = session.send("first", &tx).await.unwrap();

    session.start_new_conversation().unwrap();
    assert!(session.snapshot().messages.is_empty());

    let second = session.send("second", &tx).await.unwrap();
    assert_ne!(first.conversation_id, second.conversation_id);
    assert_eq!(session.gateway().recent_conversations(10).await.unwrap().len(), 2);
}
