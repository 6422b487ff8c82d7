//! Cluster domain logic
//!
//! - `auth` - credential registration and verification (C2)
//! - `membership` - peer table, leader reference, election (C6, C7)
//! - `delivery` - online-delivery hub (C3)
//! - `replication` - leader fan-out engine (C5)

pub mod auth;
pub mod delivery;
pub mod error;
pub mod membership;
pub mod replication;

pub use delivery::DeliveryHub;
pub use error::DomainError;
pub use membership::{Membership, PeerInfo};
