// Application layer - the ledger operations and their error taxonomy.
// Transports (CLI, HTTP) call into `LedgerService` and only parse input.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
