//! Query functions grouped by table, each taking a pool reference directly.
//! Every operation here is best-effort: on I/O error the caller gets a
//! failure and does not retry (§4.1 of the design).

pub mod message;
pub mod user;

pub use message::MessageRow;
