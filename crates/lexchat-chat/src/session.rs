use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use lexchat_llm::{ChatClient, ChatRequest, Message, Role, StreamEvent};
use lexchat_persist::{ConversationGateway, Principal};

use crate::assembler::TranscriptAssembler;
use crate::error::TurnError;
use crate::events::{
    ChatEvent, EMPTY_RESPONSE_NOTICE, SIGN_IN_NOTICE, TRANSPORT_FAILURE_MESSAGE,
};

/// Capacity of the per-turn event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of a finished turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub conversation_id: Option<String>,
    /// `None` when the stream completed without any content
    pub reply: Option<String>,
    pub persisted: bool,
}

/// Read-only view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub conversation_id: Option<String>,
    pub messages: Vec<Message>,
    /// Assistant text of the turn currently streaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<String>,
    pub is_loading: bool,
}

struct PanelState {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    streaming: Option<String>,
    sign_in_notice_shown: bool,
    user_id: Option<String>,
    /// Bumped whenever the transcript is dropped for a principal change
    epoch: u64,
    auth_changes: watch::Receiver<Option<Principal>>,
}

impl PanelState {
    /// Apply a principal change seen since the last turn.
    fn sync_principal(&mut self) {
        if !self.auth_changes.has_changed().unwrap_or(false) {
            return;
        }
        let next = self
            .auth_changes
            .borrow_and_update()
            .as_ref()
            .map(|p| p.user_id.clone());
        if next == self.user_id {
            return;
        }

        // The open conversation belongs to the previous principal.
        if self.user_id.is_some() {
            self.conversation_id = None;
            self.messages.clear();
            self.streaming = None;
            self.epoch += 1;
        }
        self.user_id = next;
        self.sign_in_notice_shown = false;
    }
}

/// Resets the loading latch when dropped.
struct LoadingGuard(Arc<AtomicBool>);

impl LoadingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One chat panel: its transcript, its open conversation and its latch.
///
/// At most one turn runs at a time; a second send while a response is
/// streaming fails with `TurnError::Busy`.
pub struct ChatSession {
    client: Arc<dyn ChatClient>,
    gateway: ConversationGateway,
    loading: Arc<AtomicBool>,
    state: Mutex<PanelState>,
}

impl ChatSession {
    pub fn new(client: Arc<dyn ChatClient>, gateway: ConversationGateway) -> Self {
        let auth_changes = gateway.auth().subscribe();
        let user_id = gateway.principal().map(|p| p.user_id);

        Self {
            client,
            gateway,
            loading: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(PanelState {
                conversation_id: None,
                messages: Vec::new(),
                streaming: None,
                sign_in_notice_shown: false,
                user_id,
                epoch: 0,
                auth_changes,
            }),
        }
    }

    pub fn gateway(&self) -> &ConversationGateway {
        &self.gateway
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut state = self.lock_state();
        state.sync_principal();
        SessionSnapshot {
            conversation_id: state.conversation_id.clone(),
            messages: state.messages.clone(),
            streaming: state.streaming.clone(),
            is_loading: self.is_loading(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `f` to the panel unless its transcript was dropped since `epoch`.
    fn update_turn_state<R>(&self, epoch: u64, f: impl FnOnce(&mut PanelState) -> R) -> Option<R> {
        let mut state = self.lock_state();
        state.sync_principal();
        if state.epoch == epoch {
            Some(f(&mut *state))
        } else {
            None
        }
    }

    fn begin_turn(&self, text: &str) -> Result<LoadingGuard, TurnError> {
        if text.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }
        LoadingGuard::acquire(&self.loading).ok_or(TurnError::Busy)
    }

    /// Load a persisted conversation into this session.
    pub async fn resume(&self, conversation_id: &str) -> Result<(), TurnError> {
        let _guard = LoadingGuard::acquire(&self.loading).ok_or(TurnError::Busy)?;
        self.lock_state().sync_principal();

        let transcript = self.gateway.load_transcript(conversation_id).await?;

        let mut state = self.lock_state();
        state.conversation_id = Some(conversation_id.to_string());
        state.messages = transcript.into_iter().map(Message::from).collect();
        state.streaming = None;
        tracing::info!(
            %conversation_id,
            messages = state.messages.len(),
            "Resumed conversation"
        );
        Ok(())
    }

    /// Forget the open conversation; the next message starts a new one.
    pub fn start_new_conversation(&self) -> Result<(), TurnError> {
        let _guard = LoadingGuard::acquire(&self.loading).ok_or(TurnError::Busy)?;
        let mut state = self.lock_state();
        state.conversation_id = None;
        state.messages.clear();
        state.streaming = None;
        Ok(())
    }

    /// Run a turn on the current task, reporting through `events`.
    pub async fn send(
        &self,
        text: &str,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<TurnOutcome, TurnError> {
        let _guard = self.begin_turn(text)?;
        self.run_turn(text.trim(), events).await
    }

    /// Spawn a turn in background, return event receiver
    ///
    /// The latch is taken before returning, so a concurrent call fails
    /// immediately with `TurnError::Busy`. Dropping the receiver abandons the
    /// turn at the next snapshot.
    pub fn spawn_turn(
        self: &Arc<Self>,
        text: impl Into<String>,
    ) -> Result<mpsc::Receiver<ChatEvent>, TurnError> {
        let text = text.into();
        let guard = self.begin_turn(&text)?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let session = Arc::clone(self);

        tokio::spawn(async move {
            let result = session.run_turn(text.trim(), &tx).await;
            // Release the latch before the receiver observes the end of the turn.
            drop(guard);
            drop(tx);
            if let Err(e) = result {
                tracing::debug!("Turn ended early: {}", e);
            }
        });

        Ok(rx)
    }

    async fn run_turn(
        &self,
        text: &str,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<TurnOutcome, TurnError> {
        let (existing_id, history, show_sign_in, epoch, user_id) = {
            let mut state = self.lock_state();
            state.sync_principal();

            let show_sign_in = state.user_id.is_none() && !state.sign_in_notice_shown;
            if show_sign_in {
                state.sign_in_notice_shown = true;
            }
            state.messages.push(Message::user(text));
            (
                state.conversation_id.clone(),
                state.messages.clone(),
                show_sign_in,
                state.epoch,
                state.user_id.clone(),
            )
        };
        // Writes below are owned by whoever sent this message.
        let owner = user_id.as_deref();

        if show_sign_in {
            emit(events, ChatEvent::notice(SIGN_IN_NOTICE)).await;
        }

        let conversation_id = self
            .gateway
            .ensure_conversation_for(owner, existing_id.as_deref(), text)
            .await;
        if existing_id.is_none() {
            if let Some(id) = &conversation_id {
                let opened = self
                    .update_turn_state(epoch, |state| state.conversation_id = Some(id.clone()))
                    .is_some();
                if opened {
                    emit(events, ChatEvent::Conversation { conversation_id: id.clone() }).await;
                }
            }
        }
        if let Some(id) = &conversation_id {
            self.gateway.append_message_for(owner, id, Role::User, text).await;
        }

        let mut stream = match self.client.chat_stream(ChatRequest::new(history)).await {
            Ok(stream) => stream,
            Err(e) => return self.fail_turn(epoch, events, e).await,
        };

        let mut assembler = TranscriptAssembler::new();
        let mut completed = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(StreamEvent::Message { content }) => {
                    let snapshot = assembler.push(&content).to_string();
                    self.update_turn_state(epoch, |state| state.streaming = Some(snapshot.clone()));
                    if events.send(ChatEvent::Snapshot { content: snapshot }).await.is_err() {
                        tracing::debug!("Turn consumer went away, abandoning stream");
                        self.update_turn_state(epoch, |state| state.streaming = None);
                        return Err(TurnError::Abandoned);
                    }
                }
                Ok(StreamEvent::Done) => {
                    completed = true;
                    break;
                }
                Err(e) => return self.fail_turn(epoch, events, e).await,
            }
        }

        if !completed {
            return self
                .fail_turn(epoch, events, anyhow::anyhow!("Completion stream ended without [DONE]"))
                .await;
        }

        let Some(reply) = assembler.finish() else {
            tracing::warn!("Completion stream finished without content");
            self.update_turn_state(epoch, |state| state.streaming = None);
            emit(events, ChatEvent::notice(EMPTY_RESPONSE_NOTICE)).await;
            return Ok(TurnOutcome {
                conversation_id,
                reply: None,
                persisted: false,
            });
        };

        let kept = self.update_turn_state(epoch, |state| {
            state.streaming = None;
            state.messages.push(Message::assistant(reply.clone()));
        });
        if kept.is_none() {
            tracing::warn!("Principal changed mid-turn, reply left out of the open transcript");
        }

        let persisted = match &conversation_id {
            Some(id) => {
                self.gateway
                    .append_message_for(owner, id, Role::Assistant, &reply)
                    .await
            }
            None => false,
        };

        emit(
            events,
            ChatEvent::Completed {
                content: reply.clone(),
                persisted,
            },
        )
        .await;

        Ok(TurnOutcome {
            conversation_id,
            reply: Some(reply),
            persisted,
        })
    }

    async fn fail_turn(
        &self,
        epoch: u64,
        events: &mpsc::Sender<ChatEvent>,
        error: anyhow::Error,
    ) -> Result<TurnOutcome, TurnError> {
        tracing::error!("Chat turn failed: {:#}", error);
        self.update_turn_state(epoch, |state| state.streaming = None);
        emit(
            events,
            ChatEvent::Error {
                message: TRANSPORT_FAILURE_MESSAGE.to_string(),
            },
        )
        .await;
        Err(TurnError::Transport(error))
    }
}

async fn emit(events: &mpsc::Sender<ChatEvent>, event: ChatEvent) {
    if events.send(event).await.is_err() {
        tracing::debug!("Turn consumer went away");
    }
}
