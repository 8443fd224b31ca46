//! Inbound receipt endpoint
//!
//! - [`receipt`] - authentication, routing and storage of pushed documents
//! - [`server`] - axum router and listener

pub mod receipt;
pub mod server;

pub use receipt::{
    cxml_status, Authenticator, ConfigAuthenticator, ReceiptPayload, ReceiptResponse,
    ReceiptService, UploadedFile,
};
pub use server::{router, serve};
