//! # HTTP Transport
//!
//! The transport collaborator consumed by the collection runner: a
//! [`HttpClient`] sends one [`PreparedRequest`] and yields one
//! [`ResponseRecord`] or a [`RequestError`]. The bundled
//! [`ReqwestClient`] is the production implementation; tests swap in
//! scripted clients through the same trait.

pub mod client;
pub mod error;
pub mod response;

pub use client::{HttpClient, PreparedRequest, ReqwestClient};
pub use error::{ErrorCode, RequestError};
pub use response::ResponseRecord;
