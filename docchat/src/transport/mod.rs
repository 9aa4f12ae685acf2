//! Transport gateway to the question-answering service.
//!
//! The [`TransportGateway`] trait is the seam the session store calls
//! through; [`HttpGateway`] is the production implementation.

mod gateway;
mod http;

pub use gateway::{Answer, DocumentFile, TransportGateway, UploadReceipt};
pub use http::HttpGateway;
