//! Core types for the certificate registry
//!
//! Principal identities, certificate identifiers, issuer and certificate
//! records with their state machines, and the events emitted when the
//! registry commits a transition.

pub mod certificate;
pub mod event;
pub mod identity;
pub mod issuer;
pub mod time;

pub use certificate::*;
pub use event::*;
pub use identity::*;
pub use issuer::*;
pub use time::*;
