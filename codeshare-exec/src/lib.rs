//! # codeshare-exec: remote execution of the shared buffer
//!
//! ```text
//! participant ── RunClient ──► POST /run ──► ExecutionProxy ──► Piston
//!      ▲                                                           │
//!      └───────────── ExecutionResult / ExecutionError ◄───────────┘
//! ```
//!
//! - [`language`]: language identifiers and the file-extension table
//! - [`result`]: result/error types and shared response parsing
//! - [`proxy`]: server-side forwarding to the execution backend
//! - [`client`]: participant-side caller of `POST /run`

pub mod language;
pub mod result;
pub mod proxy;
pub mod client;

pub use language::Language;
pub use result::{parse_response, ExecutionError, ExecutionResult, StageOutput, NO_OUTPUT};
pub use proxy::{BackendRequest, ExecutionProxy, SourceFile, ANY_VERSION, DEFAULT_ENDPOINT};
pub use client::{RunClient, RunRequest};
