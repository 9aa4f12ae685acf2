//! Docchat - a single-document question-answering chat client.
//!
//! A user uploads one document and then asks questions about it. This crate
//! holds the client-side core: the session state machine that tracks the
//! active document and the conversation, and the transport gateway that
//! talks to the remote question-answering service.
//!
//! # Architecture
//!
//! - **Session** ([`session`]) - the [`SessionStore`] owns the state and runs
//!   the `upload_document` / `ask_question` commands, single-flight
//! - **Transport** ([`transport`]) - the [`TransportGateway`] trait and its
//!   HTTP implementation, normalising every outcome into a `Result`
//! - **Config** ([`config`]) - service endpoint and HTTP client settings
//! - **Error** ([`error`]) - rejections, transport failures, config errors
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use docchat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let gateway = HttpGateway::new(&ClientConfig::default())?;
//!     let store = SessionStore::new(gateway);
//!
//!     let file = DocumentFile::from_path("report.pdf").await?;
//!     store.upload_document(Some(file)).await?;
//!     store.ask_question("What is the conclusion?").await?;
//!
//!     for msg in store.snapshot().messages() {
//!         println!("{}: {}", msg.role(), msg.text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`SessionStore`]: session::SessionStore
//! [`TransportGateway`]: transport::TransportGateway

pub mod config;
pub mod error;
pub mod session;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    // Error types (centralized)
    pub use crate::error::{
        ConfigError, ConfigResult, Error, Result, SessionError, TransportError, TransportResult,
    };

    // Config
    pub use crate::config::{ClientConfig, config_path, init_config, load_config, save_config};

    // Session
    pub use crate::session::{DocumentRef, Message, Role, SessionState, SessionStore};

    // Transport
    pub use crate::transport::{Answer, DocumentFile, HttpGateway, TransportGateway, UploadReceipt};
}
