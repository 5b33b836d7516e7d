//! HTTP API for UTR entries.
//!
//! Routes mirror the endpoints the UTR entry screens already call, so the
//! paths, parameter names and response keys are kept as those clients expect.

pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use router::build_router;
pub use server::UtrServer;
