//! Row models, create/update DTOs and the hydrated aggregates served from
//! the cache.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` struct matching the table row
//! - `Deserialize` DTOs for inserts and partial updates where the table is
//!   written through the API

pub mod event;
pub mod game;
pub mod player;
pub mod role;
