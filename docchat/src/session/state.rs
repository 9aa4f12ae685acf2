//! Session state and the transitions that advance it.
//!
//! Every change is either an opening [`SessionEvent`] (a call is dispatched)
//! or a closing [`Outcome`] (the call finished). Each bumps the version.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The currently active uploaded document.
///
/// A new upload replaces the reference wholesale; it is never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    file_id: String,
    display_name: String,
}

impl DocumentRef {
    /// Create a document reference.
    pub fn new(file_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            display_name: display_name.into(),
        }
    }

    /// Server-issued identifier of the document.
    #[must_use]
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Name of the file as the user selected it.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Author of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions.
    User,
    /// The question-answering service.
    Assistant,
    /// The client itself (upload notices, failures).
    System,
}

impl Role {
    /// Lowercase name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    text: String,
    sequence: u64,
}

impl Message {
    /// Role of the author.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Position of the message in the log, starting at zero.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// A transition that opens a remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// An upload was dispatched.
    UploadStarted,
    /// A question was dispatched.
    QuestionAsked {
        /// The trimmed question text.
        text: String,
    },
}

/// How an in-flight call finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The upload completed; `document` becomes active.
    UploadSucceeded {
        /// The new active document.
        document: DocumentRef,
    },
    /// The upload failed.
    UploadFailed {
        /// Human-readable failure description.
        reason: String,
    },
    /// The service answered the pending question.
    AnswerReceived {
        /// The answer text.
        text: String,
    },
    /// The pending question failed.
    AskFailed {
        /// Human-readable failure description.
        reason: String,
    },
}

/// Point-in-time view of a session.
///
/// Instances handed out by the store are shared immutably; a transition
/// produces a new version instead of editing a published one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    version: u64,
    document: Option<DocumentRef>,
    messages: Vec<Message>,
    busy: bool,
}

impl SessionState {
    /// Number of transitions applied so far.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The active document, if any.
    #[must_use]
    pub const fn document(&self) -> Option<&DocumentRef> {
        self.document.as_ref()
    }

    /// The conversation log in render order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a remote call is in flight.
    #[must_use]
    pub const fn busy(&self) -> bool {
        self.busy
    }

    /// Messages whose sequence is at least `from`.
    #[must_use]
    pub fn messages_since(&self, from: u64) -> &[Message] {
        let start = usize::try_from(from)
            .unwrap_or(usize::MAX)
            .min(self.messages.len());
        &self.messages[start..]
    }

    /// The most recently appended message.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Open a remote call.
    pub(crate) fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::UploadStarted => {
                self.busy = true;
                self.version += 1;
            }
            SessionEvent::QuestionAsked { text } => {
                self.append(Role::User, text);
                self.busy = true;
                self.version += 1;
            }
        }
    }

    /// Close the in-flight call, returning the message it appended.
    pub(crate) fn settle(&mut self, outcome: Outcome) -> Message {
        let message = match outcome {
            Outcome::UploadSucceeded { document } => {
                let text = format!("Successfully uploaded {}", document.display_name());
                self.document = Some(document);
                self.append(Role::System, text)
            }
            Outcome::UploadFailed { reason } => {
                self.append(Role::System, format!("Error uploading file: {reason}"))
            }
            Outcome::AnswerReceived { text } => self.append(Role::Assistant, text),
            Outcome::AskFailed { reason } => self.append(Role::System, format!("Error: {reason}")),
        };
        self.busy = false;
        self.version += 1;
        message
    }

    fn append(&mut self, role: Role, text: String) -> Message {
        let message = Message {
            role,
            text,
            sequence: self.messages.len() as u64,
        };
        self.messages.push(message.clone());
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_success_replaces_document() {
        let mut state = SessionState::default();
        state.apply(SessionEvent::UploadStarted);
        assert!(state.busy());
        assert!(state.messages().is_empty());

        let msg = state.settle(Outcome::UploadSucceeded {
            document: DocumentRef::new("f1", "doc.pdf"),
        });
        assert_eq!(msg.sequence(), 0);
        assert!(!state.busy());
        assert_eq!(state.document(), Some(&DocumentRef::new("f1", "doc.pdf")));
        assert_eq!(state.messages()[0].text(), "Successfully uploaded doc.pdf");

        state.apply(SessionEvent::UploadStarted);
        state.settle(Outcome::UploadSucceeded {
            document: DocumentRef::new("f2", "other.pdf"),
        });
        assert_eq!(state.document().map(DocumentRef::file_id), Some("f2"));
        assert_eq!(state.version(), 4);
    }

    #[test]
    fn test_failures_keep_document() {
        let mut state = SessionState::default();
        state.settle(Outcome::UploadSucceeded {
            document: DocumentRef::new("f1", "doc.pdf"),
        });
        state.apply(SessionEvent::UploadStarted);
        state.settle(Outcome::UploadFailed {
            reason: "server rejected the request (HTTP 500)".into(),
        });

        assert_eq!(state.document().map(DocumentRef::file_id), Some("f1"));
        let last = state.last_message().unwrap();
        assert_eq!(last.role(), Role::System);
        assert_eq!(
            last.text(),
            "Error uploading file: server rejected the request (HTTP 500)"
        );
    }

    #[test]
    fn test_sequence_matches_position() {
        let mut state = SessionState::default();
        state.apply(SessionEvent::QuestionAsked { text: "a".into() });
        state.settle(Outcome::AnswerReceived { text: "b".into() });
        state.apply(SessionEvent::QuestionAsked { text: "c".into() });
        let last = state.settle(Outcome::AskFailed {
            reason: "boom".into(),
        });
        assert_eq!(last.sequence(), 3);
        assert_eq!(state.version(), 4);

        for (i, msg) in state.messages().iter().enumerate() {
            assert_eq!(msg.sequence(), i as u64);
        }
        assert_eq!(state.messages()[3].text(), "Error: boom");
        assert_eq!(state.messages_since(2).len(), 2);
        assert!(state.messages_since(10).is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::System.to_string(), "system");
    }
}
