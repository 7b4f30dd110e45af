use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use lexchat_chat::ChatSession;
use lexchat_llm::{ChatClient, RelayClient};
use lexchat_persist::{ConversationGateway, PersistenceClient, Principal, SessionAuth};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// A chat panel and the auth state it observes
struct SessionEntry {
    session: Arc<ChatSession>,
    auth: Arc<SessionAuth>,
    last_seen: Mutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|p| p.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.lock().unwrap_or_else(|p| p.into_inner()).elapsed()
    }
}

/// How often idle sessions are looked for
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state passed to all handlers
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn PersistenceClient>,
    pub chat_client: Arc<dyn ChatClient>,
    pub relay: Option<Arc<RelayClient>>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn PersistenceClient>,
        chat_client: Arc<dyn ChatClient>,
        relay: Option<RelayClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            chat_client,
            relay: relay.map(Arc::new),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Gateway acting for a single request's principal
    pub fn gateway_for(&self, principal: Option<Principal>) -> ConversationGateway {
        let auth = match principal {
            Some(principal) => SessionAuth::signed_in(principal),
            None => SessionAuth::new(),
        };
        ConversationGateway::new(Arc::clone(&self.store), Arc::new(auth))
    }

    /// Open a chat session and return its id
    pub async fn create_session(&self, principal: Option<Principal>) -> (String, Arc<ChatSession>) {
        let auth = Arc::new(SessionAuth::new());
        auth.set(principal);

        let gateway = ConversationGateway::new(Arc::clone(&self.store), auth.clone());
        let session = Arc::new(ChatSession::new(Arc::clone(&self.chat_client), gateway));
        let session_id = uuid::Uuid::new_v4().to_string();

        self.sessions.write().await.insert(
            session_id.clone(),
            SessionEntry {
                session: Arc::clone(&session),
                auth,
                last_seen: Mutex::new(Instant::now()),
            },
        );
        tracing::info!(%session_id, "Created chat session");

        (session_id, session)
    }

    /// Look up a session and bring its principal in line with the request.
    pub async fn session(
        &self,
        session_id: &str,
        principal: Option<Principal>,
    ) -> ApiResult<Arc<ChatSession>> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

        entry.auth.set(principal);
        entry.touch();
        Ok(Arc::clone(&entry.session))
    }

    /// Close a session. A turn still streaming finishes on its own.
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::info!(%session_id, "Closed chat session");
        }
        removed
    }

    /// Drop sessions untouched for at least `idle` that are not mid-turn.
    pub async fn prune_idle_sessions(&self, idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.session.is_loading() || entry.idle_for() < idle);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::info!(pruned, remaining = sessions.len(), "Pruned idle chat sessions");
        }
        pruned
    }

    /// Periodically prune sessions idle longer than `chat.session_idle_secs`.
    pub fn spawn_session_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let idle = Duration::from_secs(state.config.chat.session_idle_secs);
        tokio::spawn(async move {
            let period = SWEEP_INTERVAL.min(idle).max(Duration::from_secs(1));
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                state.prune_idle_sessions(idle).await;
            }
        })
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
