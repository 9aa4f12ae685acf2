//! Session store: the sole owner and mutator of [`SessionState`].

use super::state::{DocumentRef, Message, Outcome, SessionEvent, SessionState};
use crate::error::SessionError;
use crate::transport::{DocumentFile, TransportGateway};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Owns the session state and sequences the two commands against the
/// transport gateway.
///
/// At most one remote call is in flight per store: `busy` is checked and set
/// in a single synchronous step before the gateway is awaited, and a command
/// arriving while busy is rejected rather than queued.
pub struct SessionStore {
    gateway: Arc<dyn TransportGateway>,
    state: watch::Sender<Arc<SessionState>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("gateway", &self.gateway.name())
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl SessionStore {
    /// Create an empty session backed by `gateway`.
    pub fn new(gateway: impl TransportGateway + 'static) -> Self {
        Self::with_gateway(Arc::new(gateway))
    }

    /// Create an empty session backed by a shared gateway.
    #[must_use]
    pub fn with_gateway(gateway: Arc<dyn TransportGateway>) -> Self {
        let (state, _) = watch::channel(Arc::new(SessionState::default()));
        Self { gateway, state }
    }

    /// Current state.
    ///
    /// The returned value is shared and immutable; later commands publish new
    /// versions and never alter it.
    #[must_use]
    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.state.borrow())
    }

    /// Receiver notified each time a new state version is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.state.subscribe()
    }

    /// The active document, if any.
    #[must_use]
    pub fn document(&self) -> Option<DocumentRef> {
        self.state.borrow().document().cloned()
    }

    /// Whether a remote call is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy()
    }

    /// Copy of the conversation log.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().messages().to_vec()
    }

    /// Upload a document and make it the active one.
    ///
    /// Remote failures are not errors: they leave the active document
    /// untouched and are reported as a `system` message. Exactly one
    /// message is appended per dispatched upload; it is returned.
    ///
    /// # Errors
    ///
    /// - [`SessionError::MissingFile`] if `file` is `None`.
    /// - [`SessionError::Busy`] if another call is in flight.
    ///
    /// Rejections leave the state untouched.
    pub async fn upload_document(
        &self,
        file: Option<DocumentFile>,
    ) -> Result<Message, SessionError> {
        let file = file.ok_or(SessionError::MissingFile)?;

        let call = self
            .begin(
                |state| {
                    if state.busy() {
                        return Err(SessionError::Busy);
                    }
                    Ok(SessionEvent::UploadStarted)
                },
                Outcome::UploadFailed {
                    reason: CANCELLED.to_string(),
                },
            )
            .inspect_err(|e| warn!(error = %e, name = %file.name(), "upload rejected"))?;

        debug!(gateway = %self.gateway.name(), name = %file.name(), "upload dispatched");

        let outcome = match self.gateway.upload(&file).await {
            Ok(receipt) => {
                info!(file_id = %receipt.file_id, name = %file.name(), "document active");
                Outcome::UploadSucceeded {
                    document: DocumentRef::new(receipt.file_id, file.name()),
                }
            }
            Err(e) => {
                warn!(error = %e, name = %file.name(), "upload failed");
                Outcome::UploadFailed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(call.finish(outcome))
    }

    /// Ask a question about the active document.
    ///
    /// The question is logged as a `user` message before the remote call, so
    /// it stays visible whatever the outcome. The follow-up (`assistant`
    /// answer or `system` failure) is appended on completion and returned.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoActiveDocument`] if nothing was uploaded yet.
    /// - [`SessionError::Busy`] if another call is in flight.
    /// - [`SessionError::EmptyInput`] if `text` is blank.
    ///
    /// Rejections leave the state untouched.
    pub async fn ask_question(&self, text: &str) -> Result<Message, SessionError> {
        let question = text.trim();
        let mut file_id = String::new();

        let call = self
            .begin(
                |state| {
                    let document = state.document().ok_or(SessionError::NoActiveDocument)?;
                    if state.busy() {
                        return Err(SessionError::Busy);
                    }
                    if question.is_empty() {
                        return Err(SessionError::EmptyInput);
                    }
                    file_id = document.file_id().to_string();
                    Ok(SessionEvent::QuestionAsked {
                        text: question.to_string(),
                    })
                },
                Outcome::AskFailed {
                    reason: CANCELLED.to_string(),
                },
            )
            .inspect_err(|e| warn!(error = %e, "question rejected"))?;

        debug!(gateway = %self.gateway.name(), file_id = %file_id, "question dispatched");

        let outcome = match self.gateway.ask(question, &file_id).await {
            Ok(answer) => Outcome::AnswerReceived { text: answer.text },
            Err(e) => {
                warn!(error = %e, file_id = %file_id, "question failed");
                Outcome::AskFailed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(call.finish(outcome))
    }

    /// Validate preconditions against the current state and, if they hold,
    /// apply the opening event. Runs entirely under the channel lock.
    ///
    /// `on_drop` settles the call if the command future is dropped before
    /// it finishes.
    fn begin<F>(&self, check: F, on_drop: Outcome) -> Result<InFlight<'_>, SessionError>
    where
        F: FnOnce(&SessionState) -> Result<SessionEvent, SessionError>,
    {
        let mut opened = Ok(());
        self.state.send_if_modified(|current| match check(&**current) {
            Ok(event) => {
                Arc::make_mut(current).apply(event);
                true
            }
            Err(e) => {
                opened = Err(e);
                false
            }
        });
        opened.map(|()| InFlight {
            store: self,
            on_drop: Some(on_drop),
        })
    }

    /// Close the in-flight call and publish the resulting version.
    fn complete(&self, outcome: Outcome) -> Message {
        // While busy every other command is rejected, so nothing can be
        // published between this read and the replace.
        let mut next = SessionState::clone(&self.state.borrow());
        let message = next.settle(outcome);
        self.state.send_replace(Arc::new(next));
        message
    }
}

/// Reason logged when a command is dropped mid-call.
const CANCELLED: &str = "request cancelled";

/// The single in-flight call of a store.
struct InFlight<'a> {
    store: &'a SessionStore,
    on_drop: Option<Outcome>,
}

impl InFlight<'_> {
    fn finish(mut self, outcome: Outcome) -> Message {
        self.on_drop = None;
        self.store.complete(outcome)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(outcome) = self.on_drop.take() {
            warn!("command dropped while in flight");
            self.store.complete(outcome);
        }
    }
}
