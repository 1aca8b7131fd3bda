//! Well-known role names and the capabilities they grant.
//!
//! The names must match the seed data in `20240301000001_create_directory_tables.sql`.
//! Call sites ask for a [`Capability`] instead of comparing role names, so
//! adding a role that grants an existing capability needs no code changes
//! outside [`capabilities_of`].

use serde::Serialize;

pub const ROLE_USER: &str = "User";
pub const ROLE_TOURNAMENT: &str = "Tournament";
pub const ROLE_COMMUNICATIONS: &str = "Communications";
pub const ROLE_ADMIN: &str = "Admin";

/// Something a player is allowed (or entitled) to do because of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Receives club-wide texts; requires a main-channel subscription.
    ClubBroadcasts,
    /// May send club-wide and event messages.
    SendCommunications,
    /// May create and run tournaments.
    ManageTournaments,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::ClubBroadcasts,
        Capability::SendCommunications,
        Capability::ManageTournaments,
    ];
}

/// Capabilities granted by a role, looked up by its exact name.
///
/// Unknown role names grant nothing.
pub fn capabilities_of(role_name: &str) -> &'static [Capability] {
    match role_name {
        ROLE_USER => &[Capability::ClubBroadcasts],
        ROLE_COMMUNICATIONS => &[Capability::SendCommunications],
        ROLE_TOURNAMENT => &[Capability::ManageTournaments],
        ROLE_ADMIN => &Capability::ALL,
        _ => &[],
    }
}

/// Whether any of the given role names grants `capability`.
pub fn grants<'a, I>(role_names: I, capability: Capability) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    role_names
        .into_iter()
        .any(|name| capabilities_of(name).contains(&capability))
}
