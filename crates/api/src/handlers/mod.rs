pub mod club;
pub mod events;
pub mod members;
pub mod players;
pub mod roles;
