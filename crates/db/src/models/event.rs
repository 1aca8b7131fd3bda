//! Event, membership and message models, plus the hydrated [`EventDetail`]
//! aggregate.

use chrono::NaiveDateTime;
use linksters_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::player::Player;

/// A row from the `event` table.
///
/// `topic` holds the handle of the event's broadcast channel.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub name: String,
    pub date: NaiveDateTime,
    pub paid_event: bool,
    pub cost: f64,
    pub topic: String,
    pub description: Option<String>,
    pub owner_id: DbId,
    pub invite_only: bool,
}

/// DTO for creating an event.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvent {
    pub name: String,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub paid_event: bool,
    #[serde(default)]
    pub cost: f64,
    pub description: Option<String>,
    pub owner_id: DbId,
    #[serde(default)]
    pub invite_only: bool,
}

/// Row-level insert, once the channel exists.
#[derive(Debug, Clone)]
pub struct NewEvent<'a> {
    pub name: &'a str,
    pub date: NaiveDateTime,
    pub paid_event: bool,
    pub cost: f64,
    pub topic: &'a str,
    pub description: Option<&'a str>,
    pub owner_id: DbId,
    pub invite_only: bool,
}

/// DTO for updating an event. All fields are optional; the name is fixed
/// because the channel was named after it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEvent {
    pub date: Option<NaiveDateTime>,
    pub paid_event: Option<bool>,
    pub cost: Option<f64>,
    pub description: Option<String>,
    pub owner_id: Option<DbId>,
    pub invite_only: Option<bool>,
}

/// A row from the `event_members` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct EventMember {
    pub event_id: DbId,
    pub player_id: DbId,
    pub paid: bool,
    pub subscription: String,
}

/// A row from the `event_messages` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct EventMessage {
    pub id: DbId,
    pub event_id: DbId,
    pub sender_id: DbId,
    pub body: String,
    pub date: Timestamp,
    pub message_handle: String,
}

/// An event with owner, members and messages resolved to players.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub owner: Player,
    pub members: Vec<EventMemberDetail>,
    pub messages: Vec<EventMessageDetail>,
}

impl EventDetail {
    pub fn has_member(&self, player_id: DbId) -> bool {
        self.members.iter().any(|m| m.player.id == player_id)
    }

    pub fn member(&self, player_id: DbId) -> Option<&EventMemberDetail> {
        self.members.iter().find(|m| m.player.id == player_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMemberDetail {
    pub player: Player,
    pub paid: bool,
    pub subscription: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMessageDetail {
    pub id: DbId,
    pub sender: Player,
    pub body: String,
    pub date: Timestamp,
    pub message_handle: String,
}
