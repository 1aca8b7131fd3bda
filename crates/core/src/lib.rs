//! Linksters domain core.
//!
//! Pure logic shared by every other crate: identifiers, the domain error
//! type, role capabilities, phone normalization and notification wording.
//! Nothing in here touches the database or the network.

pub mod error;
pub mod notices;
pub mod phone;
pub mod roles;
pub mod types;
pub mod validation;
