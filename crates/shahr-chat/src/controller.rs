//! Session controller: a single task that owns a [`Session`].
//!
//! Callers talk to it through a cloneable [`SessionHandle`]. Commands arrive
//! on an mpsc channel and are answered on oneshot channels. Each dispatched
//! query runs in its own task under a timeout, and its result comes back on
//! a second channel, so resolutions are applied by the owner task like any
//! other command. Status is published on a watch channel; every state
//! change is broadcast as a [`SessionEvent`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::client::QueryClient;
use crate::error::{ChatError, QueryFailure};
use crate::session::{PendingQuery, Session, Submission};
use crate::types::{
    Answer, Conversation, ConversationId, Message, SessionEvent, SessionSnapshot, SessionStatus,
    SubmitOutcome,
};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

type Reply<T> = oneshot::Sender<T>;

enum Command {
    /// `None` submits the current draft.
    Submit {
        text: Option<String>,
        reply: Reply<SubmitOutcome>,
    },
    SetDraft {
        text: String,
        reply: Reply<()>,
    },
    NewConversation {
        reply: Reply<Result<Conversation, ChatError>>,
    },
    SwitchActive {
        conversation_id: ConversationId,
        reply: Reply<Result<(), ChatError>>,
    },
    Conversations {
        reply: Reply<Vec<Conversation>>,
    },
    Messages {
        conversation_id: ConversationId,
        reply: Reply<Result<Vec<Message>, ChatError>>,
    },
    ActiveMessages {
        reply: Reply<Vec<Message>>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
}

type Resolution = (PendingQuery, Result<Answer, QueryFailure>);

/// Owner task of one session.
pub struct SessionController {
    session: Session,
    client: Arc<dyn QueryClient>,
    timeout: Duration,
    commands: mpsc::Receiver<Command>,
    resolutions_tx: mpsc::UnboundedSender<Resolution>,
    resolutions_rx: mpsc::UnboundedReceiver<Resolution>,
    status_tx: watch::Sender<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Start the owner task and return a handle to it.
    ///
    /// Must be called from within a tokio runtime. The task stops once every
    /// handle has been dropped.
    pub fn spawn(
        session: Session,
        client: Arc<dyn QueryClient>,
        timeout: Duration,
    ) -> SessionHandle {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (resolutions_tx, resolutions_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(session.status());
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let controller = SessionController {
            session,
            client,
            timeout,
            commands,
            resolutions_tx,
            resolutions_rx,
            status_tx,
            events: events.clone(),
        };
        tokio::spawn(controller.run());

        SessionHandle {
            commands: command_tx,
            status: status_rx,
            events,
        }
    }

    async fn run(mut self) {
        debug!("Session controller started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some((pending, outcome)) = self.resolutions_rx.recv() => {
                    self.resolve(pending, outcome);
                }
            }
        }
        if self.session.status().is_loading() {
            warn!("Session controller stopped with a query in flight");
        }
        debug!("Session controller stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Submit { text, reply } => {
                let text = text.unwrap_or_else(|| self.session.draft().to_string());
                let _ = reply.send(self.submit(&text));
            }
            Command::SetDraft { text, reply } => {
                self.session.set_draft(text);
                let _ = reply.send(());
            }
            Command::NewConversation { reply } => {
                let result = self.session.new_conversation();
                if let Ok(conversation) = &result {
                    info!(conversation_id = %conversation.id, "Conversation created");
                    self.emit(SessionEvent::ConversationCreated {
                        conversation: conversation.clone(),
                    });
                    self.emit(SessionEvent::ActiveChanged {
                        conversation_id: conversation.id.clone(),
                    });
                }
                let _ = reply.send(result);
            }
            Command::SwitchActive {
                conversation_id,
                reply,
            } => {
                let result = self.session.switch_active(&conversation_id);
                if result.is_ok() {
                    self.emit(SessionEvent::ActiveChanged { conversation_id });
                }
                let _ = reply.send(result);
            }
            Command::Conversations { reply } => {
                let _ = reply.send(self.session.conversations().to_vec());
            }
            Command::Messages {
                conversation_id,
                reply,
            } => {
                let result = if self.session.contains(&conversation_id) {
                    Ok(self.session.messages(&conversation_id).to_vec())
                } else {
                    Err(ChatError::UnknownConversation(conversation_id))
                };
                let _ = reply.send(result);
            }
            Command::ActiveMessages { reply } => {
                let _ = reply.send(self.session.active_messages().to_vec());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
        }
    }

    fn submit(&mut self, text: &str) -> SubmitOutcome {
        let submission = self.session.begin_submit(text);
        let outcome = submission.outcome();
        let Submission::Dispatched(pending) = submission else {
            debug!(?outcome, "Submission not dispatched");
            return outcome;
        };

        if let Some(message) = self.session.messages(pending.target()).last() {
            self.emit(SessionEvent::MessageAppended {
                conversation_id: pending.target().clone(),
                message: message.clone(),
            });
        }
        self.publish_status();
        self.dispatch(pending);
        outcome
    }

    fn dispatch(&self, pending: PendingQuery) {
        info!(conversation_id = %pending.target(), "Dispatching query");
        let client = Arc::clone(&self.client);
        let resolutions = self.resolutions_tx.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, client.ask(pending.question())).await
            {
                Ok(result) => result,
                Err(_) => Err(QueryFailure::new(format!(
                    "timed out after {}s",
                    timeout.as_secs_f32()
                ))),
            };
            if resolutions.send((pending, outcome)).is_err() {
                debug!("Controller gone before query resolved");
            }
        });
    }

    fn resolve(&mut self, pending: PendingQuery, outcome: Result<Answer, QueryFailure>) {
        if let Err(failure) = &outcome {
            warn!(conversation_id = %pending.target(), reason = %failure.reason, "Query failed");
        }
        let target = pending.target().clone();
        match self.session.complete(pending, outcome) {
            Ok(message) => self.emit(SessionEvent::MessageAppended {
                conversation_id: target,
                message,
            }),
            Err(e) => error!(conversation_id = %target, error = %e, "Failed to record reply"),
        }
        self.publish_status();
    }

    fn publish_status(&self) {
        let status = self.session.status();
        self.emit(SessionEvent::StatusChanged { status });
        self.status_tx.send_replace(status);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

/// Cloneable handle to a running [`SessionController`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Submit `text` as a user question.
    pub async fn submit(&self, text: impl Into<String>) -> Result<SubmitOutcome, ChatError> {
        let text = Some(text.into());
        self.request(|reply| Command::Submit { text, reply }).await
    }

    /// Submit the current draft.
    pub async fn submit_draft(&self) -> Result<SubmitOutcome, ChatError> {
        self.request(|reply| Command::Submit { text: None, reply })
            .await
    }

    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), ChatError> {
        let text = text.into();
        self.request(|reply| Command::SetDraft { text, reply }).await
    }

    pub async fn new_conversation(&self) -> Result<Conversation, ChatError> {
        self.request(|reply| Command::NewConversation { reply })
            .await?
    }

    pub async fn switch_active(&self, conversation_id: ConversationId) -> Result<(), ChatError> {
        self.request(|reply| Command::SwitchActive {
            conversation_id,
            reply,
        })
        .await?
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>, ChatError> {
        self.request(|reply| Command::Conversations { reply }).await
    }

    pub async fn messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, ChatError> {
        self.request(|reply| Command::Messages {
            conversation_id,
            reply,
        })
        .await?
    }

    pub async fn active_messages(&self) -> Result<Vec<Message>, ChatError> {
        self.request(|reply| Command::ActiveMessages { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, ChatError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Wait until no query is in flight.
    pub async fn wait_idle(&self) -> Result<(), ChatError> {
        let mut status = self.status.clone();
        status
            .wait_for(|s| *s == SessionStatus::Idle)
            .await
            .map(|_| ())
            .map_err(|_| ChatError::ControllerClosed)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, ChatError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| ChatError::ControllerClosed)?;
        rx.await.map_err(|_| ChatError::ControllerClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{demo_session, GREETING, QUERY_FAILURE_BODY};
    use crate::types::Sender;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const QUESTION: &str = "قوانین ساخت‌وساز چیست؟";

    /// Answers every question with "پاسخ نمونه" and counts calls.
    #[derive(Default)]
    struct FixedClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryClient for FixedClient {
        async fn ask(&self, question: &str) -> Result<Answer, QueryFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Answer {
                question: question.to_string(),
                answer: "پاسخ نمونه".to_string(),
            })
        }
    }

    struct FailingClient;

    #[async_trait]
    impl QueryClient for FailingClient {
        async fn ask(&self, _question: &str) -> Result<Answer, QueryFailure> {
            Err(QueryFailure::new("connection refused"))
        }
    }

    /// Holds each query until the gate is opened.
    struct GatedClient {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl QueryClient for GatedClient {
        async fn ask(&self, question: &str) -> Result<Answer, QueryFailure> {
            self.gate.notified().await;
            Ok(Answer {
                question: question.to_string(),
                answer: "late".to_string(),
            })
        }
    }

    struct StalledClient;

    #[async_trait]
    impl QueryClient for StalledClient {
        async fn ask(&self, _question: &str) -> Result<Answer, QueryFailure> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(QueryFailure::new("unreachable"))
        }
    }

    fn spawn_with(client: Arc<dyn QueryClient>) -> SessionHandle {
        SessionController::spawn(Session::new(120), client, Duration::from_secs(5))
    }

    async fn settle(handle: &SessionHandle) {
        tokio::time::timeout(Duration::from_secs(5), handle.wait_idle())
            .await
            .expect("controller should settle")
            .unwrap();
    }

    // ---- submit ----

    #[tokio::test]
    async fn test_submit_success_appends_answer() {
        let client = Arc::new(FixedClient::default());
        let handle = spawn_with(client.clone());

        let outcome = handle.submit(QUESTION).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Dispatched);
        settle(&handle).await;

        let messages = handle.active_messages().await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].body(), GREETING);
        assert_eq!(messages[1].sender(), Sender::User);
        assert_eq!(messages[2].search().unwrap().answer, "پاسخ نمونه");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_submit_failure_appends_fallback() {
        let handle = spawn_with(Arc::new(FailingClient));
        handle.submit(QUESTION).await.unwrap();
        settle(&handle).await;

        let messages = handle.active_messages().await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].body(), QUERY_FAILURE_BODY);
        assert!(messages[2].search().is_none());
    }

    #[tokio::test]
    async fn test_blank_submit_skipped_without_query() {
        let client = Arc::new(FixedClient::default());
        let handle = spawn_with(client.clone());

        assert_eq!(handle.submit("   ").await.unwrap(), SubmitOutcome::Skipped);
        assert_eq!(handle.active_messages().await.unwrap().len(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_draft_uses_and_clears_draft() {
        let handle = spawn_with(Arc::new(FixedClient::default()));
        handle.set_draft("از پیش نوشته").await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().draft, "از پیش نوشته");

        assert_eq!(handle.submit_draft().await.unwrap(), SubmitOutcome::Dispatched);
        settle(&handle).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.draft.is_empty());
        let messages = handle.active_messages().await.unwrap();
        assert_eq!(messages[1].body(), "از پیش نوشته");
    }

    // ---- while awaiting ----

    #[tokio::test]
    async fn test_busy_while_awaiting() {
        let gate = Arc::new(Notify::new());
        let handle = SessionController::spawn(
            demo_session(120).unwrap(),
            Arc::new(GatedClient { gate: gate.clone() }),
            Duration::from_secs(5),
        );

        assert_eq!(handle.submit("first").await.unwrap(), SubmitOutcome::Dispatched);
        assert_eq!(handle.status(), SessionStatus::Awaiting);

        assert_eq!(handle.submit("second").await.unwrap(), SubmitOutcome::Busy);
        assert!(matches!(handle.new_conversation().await, Err(ChatError::Busy)));
        assert!(matches!(
            handle.switch_active(ConversationId::from("2")).await,
            Err(ChatError::Busy)
        ));

        gate.notify_one();
        settle(&handle).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.conversations.len(), 3);
        assert_eq!(snapshot.active, Some(ConversationId::from("1")));
        let messages = handle.messages(ConversationId::from("1")).await.unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[4].body(), "نتایج جستجو برای: first");
    }

    #[tokio::test]
    async fn test_timeout_becomes_fallback() {
        let handle = SessionController::spawn(
            Session::new(120),
            Arc::new(StalledClient),
            Duration::from_millis(50),
        );
        handle.submit(QUESTION).await.unwrap();
        settle(&handle).await;

        let messages = handle.active_messages().await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].body(), QUERY_FAILURE_BODY);
    }

    // ---- conversations ----

    #[tokio::test]
    async fn test_new_conversation_and_switch() {
        let handle = spawn_with(Arc::new(FixedClient::default()));
        let first = handle.snapshot().await.unwrap().active.unwrap();
        let second = handle.new_conversation().await.unwrap();

        let conversations = handle.conversations().await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].id, second.id);

        handle.switch_active(first.clone()).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().active, Some(first));
    }

    #[tokio::test]
    async fn test_messages_unknown_conversation() {
        let handle = spawn_with(Arc::new(FixedClient::default()));
        let result = handle.messages(ConversationId::from("ghost")).await;
        assert!(matches!(result, Err(ChatError::UnknownConversation(_))));
    }

    // ---- events ----

    #[tokio::test]
    async fn test_round_trip_event_sequence() {
        let handle = spawn_with(Arc::new(FixedClient::default()));
        let mut events = handle.subscribe();

        handle.submit(QUESTION).await.unwrap();
        settle(&handle).await;

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                SessionEvent::MessageAppended { message, .. } => match message.sender() {
                    Sender::User => "user",
                    Sender::Assistant => "assistant",
                },
                SessionEvent::StatusChanged {
                    status: SessionStatus::Awaiting,
                } => "awaiting",
                SessionEvent::StatusChanged {
                    status: SessionStatus::Idle,
                } => "idle",
                _ => "other",
            });
        }
        assert_eq!(kinds, vec!["user", "awaiting", "assistant", "idle"]);
    }

    #[tokio::test]
    async fn test_new_conversation_events() {
        let handle = spawn_with(Arc::new(FixedClient::default()));
        let mut events = handle.subscribe();
        let created = handle.new_conversation().await.unwrap();

        match events.recv().await.unwrap() {
            SessionEvent::ConversationCreated { conversation } => {
                assert_eq!(conversation.id, created.id)
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match events.recv().await.unwrap() {
            SessionEvent::ActiveChanged { conversation_id } => assert_eq!(conversation_id, created.id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_many_round_trips_keep_counts() {
        let handle = spawn_with(Arc::new(FixedClient::default()));
        for i in 0..4 {
            handle.submit(format!("q{}", i)).await.unwrap();
            settle(&handle).await;
        }
        let conversations = handle.conversations().await.unwrap();
        assert_eq!(conversations[0].message_count, 9);
        assert_eq!(handle.active_messages().await.unwrap().len(), 9);
    }
}
