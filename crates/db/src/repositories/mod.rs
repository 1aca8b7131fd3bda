//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! any [`sqlx::SqliteExecutor`] as the first argument: `&pool` for one-off
//! statements, `&mut *tx` inside a transaction. Every method issues exactly
//! one statement.

pub mod event_repo;
pub mod game_repo;
pub mod player_repo;
pub mod role_repo;

pub use event_repo::{EventMemberRepo, EventMessageRepo, EventRepo};
pub use game_repo::GameRepo;
pub use player_repo::PlayerRepo;
pub use role_repo::RoleRepo;
