//! Text of every SMS the club sends, plus channel naming.
//!
//! Kept free of I/O so wording changes are caught by unit tests rather than
//! by members' phones.

/// Longest channel name the notification service accepts.
pub const MAX_CHANNEL_NAME_LEN: usize = 256;

/// Derive a broadcast channel name from an event name.
///
/// Spaces become hyphens; anything outside `[A-Za-z0-9_-]` is dropped.
/// Returns `None` when nothing usable is left.
pub fn channel_name(event_name: &str) -> Option<String> {
    let name: String = event_name
        .trim()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .take(MAX_CHANNEL_NAME_LEN)
        .collect();

    if name.chars().all(|c| c == '-') {
        None
    } else {
        Some(name)
    }
}

/// Whether a member counts as settled for notification purposes.
///
/// Free events never ask anyone for money.
pub fn is_settled(paid: bool, cost: f64) -> bool {
    paid || cost == 0.0
}

/// Welcome text sent when a player joins an event.
pub fn member_added(event_name: &str, paid: bool, cost: f64, owner_preferred_name: &str) -> String {
    if is_settled(paid, cost) {
        format!("You have been added to the event \"{event_name}\".")
    } else {
        format!(
            "You have been added to \"{event_name}\".  The cost is ${cost:.2}.  \
             Please see {owner_preferred_name} to pay!"
        )
    }
}

/// Follow-up text after a member's payment state changes.
pub fn payment_updated(event_name: &str, paid: bool, cost: f64) -> String {
    if is_settled(paid, cost) {
        format!("You have been marked as paid for {event_name}.")
    } else {
        format!("You have been marked as NOT paid for {event_name}.")
    }
}

pub fn member_removed(event_name: &str) -> String {
    format!("You have been removed from event {event_name}.")
}

pub fn event_deleted(event_name: &str) -> String {
    format!("You have been removed from event {event_name}. The event is being deleted.")
}

/// Text published to a channel on behalf of a player.
pub fn message_from(sender_preferred_name: &str, body: &str) -> String {
    format!("Message from {sender_preferred_name}: {body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_replaces_spaces_and_drops_punctuation() {
        assert_eq!(channel_name("Saturday Skins").as_deref(), Some("Saturday-Skins"));
        assert_eq!(channel_name("Member/Guest '24!").as_deref(), Some("MemberGuest-24"));
    }

    #[test]
    fn channel_name_rejects_names_with_nothing_usable() {
        assert_eq!(channel_name("   "), None);
        assert_eq!(channel_name("!!! ???"), None);
    }

    #[test]
    fn channel_name_is_capped() {
        let long = "a".repeat(MAX_CHANNEL_NAME_LEN + 10);
        assert_eq!(channel_name(&long).unwrap().len(), MAX_CHANNEL_NAME_LEN);
    }

    #[test]
    fn unpaid_member_is_told_the_cost_and_who_to_pay() {
        let text = member_added("Saturday Skins", false, 20.0, "Bob");
        assert_eq!(
            text,
            "You have been added to \"Saturday Skins\".  The cost is $20.00.  Please see Bob to pay!"
        );
    }

    #[test]
    fn paid_member_and_free_event_get_plain_confirmation() {
        let expected = "You have been added to the event \"Skins\".";
        assert_eq!(member_added("Skins", true, 20.0, "Bob"), expected);
        assert_eq!(member_added("Skins", false, 0.0, "Bob"), expected);
    }

    #[test]
    fn payment_texts_differ_by_state() {
        assert_eq!(payment_updated("Skins", true, 5.0), "You have been marked as paid for Skins.");
        assert_eq!(
            payment_updated("Skins", false, 5.0),
            "You have been marked as NOT paid for Skins."
        );
    }

    #[test]
    fn message_is_prefixed_with_sender() {
        assert_eq!(message_from("Al", "Tee times moved"), "Message from Al: Tee times moved");
    }
}
