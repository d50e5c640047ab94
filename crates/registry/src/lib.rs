//! Certificate Registry
//!
//! An authority-gated ledger of verifiable credentials. Admins register
//! issuers, issuers mint and revoke certificates under their own authority,
//! and anyone can derive a certificate's current validity from its id.
//!
//! The registry is a pure state machine over a [`RegistryStore`]. Caller
//! identities are supplied by the host and only compared for equality.

pub mod access;
pub mod clock;
pub mod config;
pub mod errors;
pub mod registry;
pub mod shared;

pub use certreg_storage::{MemoryStore, RegistryStore, SledStore};
pub use certreg_types::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use errors::*;
pub use registry::CertificateRegistry;
pub use shared::SharedRegistry;
