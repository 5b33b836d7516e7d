// Application layer - use cases and orchestration.
// Reads compose repository queries; writes own the transaction and
// synchronize with the general ledger before committing.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
