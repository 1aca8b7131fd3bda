//! Assembly of the hydrated aggregates ([`PlayerWithRoles`], [`EventDetail`])
//! from their rows.
//!
//! Loaders take a single connection so a caller holding a transaction gets a
//! point-in-time view across all the statements involved. A row referencing
//! a player that does not exist is reported as [`sqlx::Error::RowNotFound`];
//! foreign keys make that unreachable in practice.

use std::collections::HashMap;

use linksters_core::types::DbId;
use sqlx::SqliteConnection;

use crate::models::event::{
    Event, EventDetail, EventMember, EventMemberDetail, EventMessage, EventMessageDetail,
};
use crate::models::player::{Player, PlayerWithRoles};
use crate::models::role::{Role, RoleMembership};
use crate::repositories::{EventMemberRepo, EventMessageRepo, EventRepo, PlayerRepo, RoleRepo};

/// Attach roles to players, preserving the order of `players`.
pub fn assemble_players(
    players: Vec<Player>,
    roles: &[Role],
    memberships: &[RoleMembership],
) -> Vec<PlayerWithRoles> {
    let roles_by_id: HashMap<DbId, &Role> = roles.iter().map(|r| (r.id, r)).collect();
    let mut held: HashMap<DbId, Vec<Role>> = HashMap::new();
    for m in memberships {
        if let Some(role) = roles_by_id.get(&m.role_id) {
            held.entry(m.player_id).or_default().push((*role).clone());
        }
    }

    players
        .into_iter()
        .map(|player| {
            let mut roles = held.remove(&player.id).unwrap_or_default();
            roles.sort_by_key(|r| r.id);
            PlayerWithRoles { player, roles }
        })
        .collect()
}

/// Resolve owner, members and message senders of one event.
pub fn assemble_event(
    event: Event,
    players: &HashMap<DbId, Player>,
    members: &[EventMember],
    messages: &[EventMessage],
) -> Result<EventDetail, sqlx::Error> {
    let lookup = |id: DbId| players.get(&id).cloned().ok_or(sqlx::Error::RowNotFound);

    let owner = lookup(event.owner_id)?;
    let members = members
        .iter()
        .filter(|m| m.event_id == event.id)
        .map(|m| {
            Ok(EventMemberDetail {
                player: lookup(m.player_id)?,
                paid: m.paid,
                subscription: m.subscription.clone(),
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;
    let messages = messages
        .iter()
        .filter(|m| m.event_id == event.id)
        .map(|m| {
            Ok(EventMessageDetail {
                id: m.id,
                sender: lookup(m.sender_id)?,
                body: m.body.clone(),
                date: m.date,
                message_handle: m.message_handle.clone(),
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(EventDetail {
        event,
        owner,
        members,
        messages,
    })
}

/// Every player with roles, ordered by preferred name.
pub async fn load_players(conn: &mut SqliteConnection) -> Result<Vec<PlayerWithRoles>, sqlx::Error> {
    let players = PlayerRepo::list(&mut *conn).await?;
    let roles = RoleRepo::list(&mut *conn).await?;
    let memberships = RoleRepo::list_memberships(&mut *conn).await?;
    Ok(assemble_players(players, &roles, &memberships))
}

pub async fn load_player(
    conn: &mut SqliteConnection,
    id: DbId,
) -> Result<Option<PlayerWithRoles>, sqlx::Error> {
    let Some(player) = PlayerRepo::find_by_id(&mut *conn, id).await? else {
        return Ok(None);
    };
    let roles = RoleRepo::list_for_player(&mut *conn, id).await?;
    Ok(Some(PlayerWithRoles { player, roles }))
}

/// Every event with members and messages, soonest first.
pub async fn load_events(conn: &mut SqliteConnection) -> Result<Vec<EventDetail>, sqlx::Error> {
    let players: HashMap<DbId, Player> = PlayerRepo::list(&mut *conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let events = EventRepo::list(&mut *conn).await?;
    let members = EventMemberRepo::list_all(&mut *conn).await?;
    let messages = EventMessageRepo::list_all(&mut *conn).await?;

    events
        .into_iter()
        .map(|e| assemble_event(e, &players, &members, &messages))
        .collect()
}

/// Hydrate a single event row.
pub async fn load_event(conn: &mut SqliteConnection, event: Event) -> Result<EventDetail, sqlx::Error> {
    let members = EventMemberRepo::list_for_event(&mut *conn, event.id).await?;
    let messages = EventMessageRepo::list_for_event(&mut *conn, event.id).await?;

    let mut ids: Vec<DbId> = members
        .iter()
        .map(|m| m.player_id)
        .chain(messages.iter().map(|m| m.sender_id))
        .chain(std::iter::once(event.owner_id))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let mut players = HashMap::with_capacity(ids.len());
    for id in ids {
        if let Some(p) = PlayerRepo::find_by_id(&mut *conn, id).await? {
            players.insert(id, p);
        }
    }

    assemble_event(event, &players, &members, &messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: DbId, name: &str) -> Player {
        Player {
            id,
            name: name.into(),
            preferred_name: name.into(),
            phone: format!("+1415555010{id}"),
            email: None,
            ghin_number: None,
            main_subscription: None,
        }
    }

    fn event(id: DbId, owner_id: DbId) -> Event {
        Event {
            id,
            name: "Skins".into(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            paid_event: false,
            cost: 0.0,
            topic: "t".into(),
            description: None,
            owner_id,
            invite_only: false,
        }
    }

    #[test]
    fn players_get_their_roles_in_id_order() {
        let roles = vec![
            Role { id: 1, name: "User".into() },
            Role { id: 4, name: "Admin".into() },
        ];
        let memberships = vec![
            RoleMembership { role_id: 4, player_id: 1 },
            RoleMembership { role_id: 1, player_id: 1 },
        ];
        let out = assemble_players(vec![player(1, "A"), player(2, "B")], &roles, &memberships);

        assert_eq!(out[0].roles, roles);
        assert!(out[1].roles.is_empty());
        assert!(out[0].has_role("Admin"));
        assert!(!out[1].has_role("User"));
    }

    #[test]
    fn event_only_takes_its_own_children() {
        let players: HashMap<DbId, Player> =
            [(1, player(1, "A")), (2, player(2, "B"))].into_iter().collect();
        let members = vec![
            EventMember { event_id: 1, player_id: 1, paid: true, subscription: "s1".into() },
            EventMember { event_id: 2, player_id: 2, paid: false, subscription: "s2".into() },
        ];

        let detail = assemble_event(event(1, 1), &players, &members, &[]).unwrap();
        assert_eq!(detail.owner.id, 1);
        assert!(detail.has_member(1));
        assert!(!detail.has_member(2));
        assert!(detail.messages.is_empty());
    }

    #[test]
    fn dangling_owner_is_an_error() {
        let players = HashMap::new();
        assert!(matches!(
            assemble_event(event(1, 9), &players, &[], &[]),
            Err(sqlx::Error::RowNotFound)
        ));
    }
}
