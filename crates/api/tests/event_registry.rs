//! Events, memberships and messages against the in-memory store and bridge.

mod common;

use assert_matches::assert_matches;
use common::{event_input, TestApp, MAIN_CHANNEL};
use linksters_api::error::AppError;
use linksters_core::error::CoreError;
use linksters_db::models::event::UpdateEvent;
use linksters_db::models::player::PlayerWithRoles;
use linksters_db::repositories::{EventMemberRepo, EventMessageRepo, EventRepo};
use linksters_notify::{BridgeError, BridgeOp, ChannelHandle, NotificationBridge};

const AL_PHONE: &str = "+14155550101";
const BO_PHONE: &str = "+14155550102";
const CY_PHONE: &str = "+14155550103";

async fn club(app: &TestApp) -> (PlayerWithRoles, PlayerWithRoles, PlayerWithRoles) {
    let al = app.player("Al", "415-555-0101", &[]).await;
    let bo = app.player("Bo", "415-555-0102", &[]).await;
    let cy = app.player("Cy", "415-555-0103", &[]).await;
    (al, bo, cy)
}

// ---------------------------------------------------------------------------
// CreateEvent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_event_has_a_channel_and_the_owner_as_its_only_paid_member() {
    let app = TestApp::new().await;
    let (al, _, _) = club(&app).await;

    let created = app.event("Saturday Skins", 20.0, al.player.id).await;

    assert!(!created.event.topic.is_empty());
    assert!(app.bridge.channel_exists(&created.event.topic).await);

    let fetched = app.state.events.get_event_by_id(created.event.id).await.unwrap();
    assert_eq!(fetched.members.len(), 1);
    assert_eq!(fetched.members[0].player.id, al.player.id);
    assert!(fetched.members[0].paid);
    assert!(fetched.messages.is_empty());
    assert_eq!(fetched.owner.id, al.player.id);
    assert_eq!(
        app.bridge.subscribers(&created.event.topic).await,
        [AL_PHONE]
    );
    assert_eq!(
        app.bridge.texts_to(AL_PHONE).await,
        ["You have been added to the event \"Saturday Skins\"."]
    );
}

#[tokio::test]
async fn created_event_is_visible_in_the_cache_and_by_name() {
    let app = TestApp::new().await;
    let (al, _, _) = club(&app).await;

    let created = app.event("Saturday Skins", 20.0, al.player.id).await;

    let listed = app.state.events.list_events().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], created);

    let by_name = app.state.events.get_event_by_name("Saturday Skins").await.unwrap();
    assert_eq!(by_name.event.id, created.event.id);
    assert_matches!(
        app.state.events.get_event_by_name("Sunday Scramble").await,
        Err(AppError::Database(sqlx::Error::RowNotFound))
    );
}

#[tokio::test]
async fn names_that_clash_on_the_channel_name_are_rejected() {
    let app = TestApp::new().await;
    let (al, _, _) = club(&app).await;
    app.event("Saturday Skins", 0.0, al.player.id).await;

    let result = app
        .state
        .events
        .create_event(event_input("Saturday  Skins!", 0.0, al.player.id))
        .await;

    // "Saturday  Skins!" derives "Saturday--Skins", which is a different channel.
    assert!(result.is_ok());

    let clash = app
        .state
        .events
        .create_event(event_input("Saturday Skins?", 0.0, al.player.id))
        .await;
    assert_matches!(clash, Err(AppError::Core(CoreError::Conflict(_))));
}

#[tokio::test]
async fn an_event_named_like_the_main_channel_is_rejected_and_leaves_it_alone() {
    let app = TestApp::new().await;
    let al = app.player("Al", "415-555-0101", &["User"]).await;
    let main_subscription = al.player.main_subscription.clone().expect("subscribed");

    let result = app
        .state
        .events
        .create_event(event_input(MAIN_CHANNEL, 0.0, al.player.id))
        .await;

    assert_matches!(result, Err(AppError::Core(CoreError::Conflict(_))));
    assert!(app.bridge.channel_exists(app.main_channel.as_str()).await);
    assert!(app.bridge.subscription_is_live(&main_subscription).await);
    assert_eq!(app.bridge.count(BridgeOp::DeleteChannel).await, 0);
    assert_eq!(app.bridge.count(BridgeOp::Subscribe).await, 1);
    assert!(EventRepo::list(&app.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn unusable_names_and_negative_costs_fail_validation_without_side_effects() {
    let app = TestApp::new().await;
    let (al, _, _) = club(&app).await;
    app.bridge.clear_calls().await;
    let events = &app.state.events;

    assert_matches!(
        events.create_event(event_input("!!!", 0.0, al.player.id)).await,
        Err(AppError::Core(CoreError::Validation(_)))
    );
    assert_matches!(
        events.create_event(event_input("Skins", -5.0, al.player.id)).await,
        Err(AppError::Core(CoreError::Validation(_)))
    );
    assert_matches!(
        events.create_event(event_input("Skins", 5.0, 999)).await,
        Err(AppError::Core(CoreError::NotFound { entity: "Player", .. }))
    );
    assert!(app.bridge.calls().await.is_empty());
}

#[tokio::test]
async fn failed_owner_subscription_deletes_the_channel_and_the_event_row() {
    let app = TestApp::new().await;
    let (al, _, _) = club(&app).await;
    app.bridge.fail_next(BridgeOp::Subscribe).await;

    let result = app
        .state
        .events
        .create_event(event_input("Saturday Skins", 20.0, al.player.id))
        .await;

    assert_matches!(
        result,
        Err(AppError::Bridge(BridgeError::Rejected { operation: BridgeOp::Subscribe, .. }))
    );
    assert!(EventRepo::list(&app.pool).await.unwrap().is_empty());
    assert_eq!(app.bridge.count(BridgeOp::DeleteChannel).await, 1);
    assert!(!app.bridge.channel_exists("memory:channel:Saturday-Skins").await);
    assert!(app.state.events.list_events().await.is_empty());
}

#[tokio::test]
async fn failed_welcome_text_unwinds_every_step() {
    let app = TestApp::new().await;
    let (al, _, _) = club(&app).await;
    app.bridge.fail_next(BridgeOp::SendToRecipient).await;

    let result = app
        .state
        .events
        .create_event(event_input("Saturday Skins", 20.0, al.player.id))
        .await;

    assert_matches!(result, Err(AppError::Bridge(_)));
    assert!(EventRepo::list(&app.pool).await.unwrap().is_empty());
    assert!(EventMemberRepo::list_all(&app.pool).await.unwrap().is_empty());
    assert_eq!(app.bridge.live_subscription_count().await, 0);
    assert!(!app.bridge.channel_exists("memory:channel:Saturday-Skins").await);
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unpaid_member_of_saturday_skins_is_told_to_see_the_owner() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Saturday Skins", 20.0, al.player.id).await;

    let member = app
        .state
        .events
        .add_member(skins.event.id, bo.player.id, false)
        .await
        .unwrap();

    assert_eq!(
        app.bridge.texts_to(BO_PHONE).await,
        ["You have been added to \"Saturday Skins\".  The cost is $20.00.  Please see Al to pay!"]
    );
    assert_eq!(member.event_id, skins.event.id);
    assert_eq!(member.player_id, bo.player.id);
    assert!(!member.paid);
    assert!(app.bridge.subscription_is_live(&member.subscription).await);

    let row = EventMemberRepo::find(&app.pool, skins.event.id, bo.player.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row, member);
}

#[tokio::test]
async fn free_events_send_the_plain_welcome_even_to_unpaid_members() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let scramble = app.event("Scramble", 0.0, al.player.id).await;

    app.state
        .events
        .add_member(scramble.event.id, bo.player.id, false)
        .await
        .unwrap();

    assert_eq!(
        app.bridge.texts_to(BO_PHONE).await,
        ["You have been added to the event \"Scramble\"."]
    );
}

#[tokio::test]
async fn adding_a_member_twice_is_a_conflict() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 5.0, al.player.id).await;
    let events = &app.state.events;
    events.add_member(skins.event.id, bo.player.id, true).await.unwrap();

    assert_matches!(
        events.add_member(skins.event.id, bo.player.id, true).await,
        Err(AppError::Core(CoreError::Conflict(_)))
    );
    assert_eq!(app.bridge.subscribers(&skins.event.topic).await, [AL_PHONE, BO_PHONE]);
}

#[tokio::test]
async fn failed_membership_welcome_removes_the_row_and_the_subscription() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 5.0, al.player.id).await;
    app.bridge.fail_next(BridgeOp::SendToRecipient).await;

    let result = app.state.events.add_member(skins.event.id, bo.player.id, false).await;

    assert_matches!(result, Err(AppError::Bridge(_)));
    assert!(EventMemberRepo::find(&app.pool, skins.event.id, bo.player.id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(app.bridge.subscribers(&skins.event.topic).await, [AL_PHONE]);
}

#[tokio::test]
async fn add_then_delete_leaves_no_row_and_a_dead_subscription() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 5.0, al.player.id).await;
    let events = &app.state.events;

    let member = events.add_member(skins.event.id, bo.player.id, false).await.unwrap();
    events.delete_member(skins.event.id, bo.player.id).await.unwrap();

    assert!(EventMemberRepo::find(&app.pool, skins.event.id, bo.player.id)
        .await
        .unwrap()
        .is_none());
    assert!(!app.bridge.subscription_is_live(&member.subscription).await);
    assert_eq!(
        app.bridge.texts_to(BO_PHONE).await.last().map(String::as_str),
        Some("You have been removed from event Skins.")
    );
    assert!(!app.state.events.list_events().await[0].has_member(bo.player.id));
}

#[tokio::test]
async fn removing_a_non_member_makes_no_bridge_calls_and_is_not_found() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 5.0, al.player.id).await;
    app.bridge.clear_calls().await;

    let result = app.state.events.delete_member(skins.event.id, bo.player.id).await;

    assert_matches!(
        result,
        Err(AppError::Core(CoreError::NotFound { entity: "EventMember", .. }))
    );
    assert!(app.bridge.calls().await.is_empty());
}

#[tokio::test]
async fn the_owner_cannot_be_removed() {
    let app = TestApp::new().await;
    let (al, _, _) = club(&app).await;
    let skins = app.event("Skins", 5.0, al.player.id).await;

    assert_matches!(
        app.state.events.delete_member(skins.event.id, al.player.id).await,
        Err(AppError::Core(CoreError::Conflict(_)))
    );
}

#[tokio::test]
async fn marking_paid_twice_texts_twice_and_only_touches_the_flag() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 20.0, al.player.id).await;
    let events = &app.state.events;
    let added = events.add_member(skins.event.id, bo.player.id, false).await.unwrap();

    let first = events.update_member(skins.event.id, bo.player.id, true).await.unwrap();
    let second = events.update_member(skins.event.id, bo.player.id, true).await.unwrap();

    assert_eq!(first, second);
    assert!(second.paid);
    assert_eq!(second.subscription, added.subscription);
    let texts = app.bridge.texts_to(BO_PHONE).await;
    assert_eq!(
        &texts[1..],
        [
            "You have been marked as paid for Skins.",
            "You have been marked as paid for Skins."
        ]
    );
    assert_eq!(
        EventMemberRepo::list_for_event(&app.pool, skins.event.id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn updating_a_non_member_is_not_found_and_sends_nothing() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 20.0, al.player.id).await;

    assert_matches!(
        app.state.events.update_member(skins.event.id, bo.player.id, true).await,
        Err(AppError::Core(CoreError::NotFound { .. }))
    );
    assert!(app.bridge.texts_to(BO_PHONE).await.is_empty());
}

#[tokio::test]
async fn failed_payment_text_restores_the_previous_flag() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 20.0, al.player.id).await;
    let events = &app.state.events;
    events.add_member(skins.event.id, bo.player.id, false).await.unwrap();
    app.bridge.fail_next(BridgeOp::SendToRecipient).await;

    assert_matches!(
        events.update_member(skins.event.id, bo.player.id, true).await,
        Err(AppError::Bridge(_))
    );
    let row = EventMemberRepo::find(&app.pool, skins.event.id, bo.player.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!row.paid);
}

// ---------------------------------------------------------------------------
// UpdateEvent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn a_new_owner_who_is_not_a_member_joins_as_paid() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 20.0, al.player.id).await;

    let updated = app
        .state
        .events
        .update_event(
            skins.event.id,
            UpdateEvent {
                owner_id: Some(bo.player.id),
                cost: Some(25.0),
                description: Some("  Bring cash  ".into()),
                ..UpdateEvent::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.event.owner_id, bo.player.id);
    assert_eq!(updated.event.cost, 25.0);
    assert_eq!(updated.event.description.as_deref(), Some("Bring cash"));
    assert_eq!(updated.event.name, "Skins");
    assert_eq!(updated.event.topic, skins.event.topic);
    assert!(updated.member(bo.player.id).unwrap().paid);
    assert!(updated.has_member(al.player.id));
}

#[tokio::test]
async fn a_new_owner_who_owes_is_marked_paid() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 20.0, al.player.id).await;
    let events = &app.state.events;
    events.add_member(skins.event.id, bo.player.id, false).await.unwrap();

    let updated = events
        .update_event(
            skins.event.id,
            UpdateEvent {
                owner_id: Some(bo.player.id),
                ..UpdateEvent::default()
            },
        )
        .await
        .unwrap();

    assert!(updated.member(bo.player.id).unwrap().paid);
    assert_eq!(
        app.bridge.texts_to(BO_PHONE).await.last().map(String::as_str),
        Some("You have been marked as paid for Skins.")
    );
    assert_eq!(app.bridge.subscribers(&skins.event.topic).await, [AL_PHONE, BO_PHONE]);
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn messages_are_published_then_recorded_with_the_raw_body() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 0.0, al.player.id).await;
    let events = &app.state.events;
    events.add_member(skins.event.id, bo.player.id, true).await.unwrap();

    let sent = events
        .send_event_message(skins.event.id, bo.player.id, "Tee times moved")
        .await
        .unwrap();

    assert_eq!(sent.body, "Tee times moved");
    assert_eq!(sent.sender.id, bo.player.id);
    assert!(!sent.message_handle.is_empty());
    assert_eq!(
        app.bridge.channel_texts(&skins.event.topic).await,
        ["Message from Bo: Tee times moved"]
    );
    let fetched = events.get_event_by_id(skins.event.id).await.unwrap();
    assert_eq!(fetched.messages, [sent]);
}

#[tokio::test]
async fn a_failed_publish_leaves_no_record() {
    let app = TestApp::new().await;
    let (al, _, _) = club(&app).await;
    let skins = app.event("Skins", 0.0, al.player.id).await;
    app.bridge.fail_next(BridgeOp::SendToChannel).await;

    let result = app
        .state
        .events
        .send_event_message(skins.event.id, al.player.id, "Rain delay")
        .await;

    assert_matches!(result, Err(AppError::Bridge(_)));
    assert!(EventMessageRepo::list_for_event(&app.pool, skins.event.id)
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// DeleteEvent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_an_event_with_three_members_tears_everything_down() {
    let app = TestApp::new().await;
    let (al, bo, cy) = club(&app).await;
    let skins = app.event("Skins", 20.0, al.player.id).await;
    let events = &app.state.events;
    events.add_member(skins.event.id, bo.player.id, false).await.unwrap();
    events.add_member(skins.event.id, cy.player.id, true).await.unwrap();
    events
        .send_event_message(skins.event.id, al.player.id, "See you Saturday")
        .await
        .unwrap();
    app.bridge.clear_calls().await;

    events.delete_event(skins.event.id).await.unwrap();

    let notice = "You have been removed from event Skins. The event is being deleted.";
    for phone in [AL_PHONE, BO_PHONE, CY_PHONE] {
        assert_eq!(app.bridge.texts_to(phone).await, [notice], "{phone}");
    }
    assert_eq!(app.bridge.count(BridgeOp::SendToRecipient).await, 3);
    assert_eq!(app.bridge.count(BridgeOp::Unsubscribe).await, 3);
    assert_eq!(app.bridge.count(BridgeOp::DeleteChannel).await, 1);
    assert!(!app.bridge.channel_exists(&skins.event.topic).await);

    assert!(EventRepo::find_by_id(&app.pool, skins.event.id).await.unwrap().is_none());
    assert!(EventMemberRepo::list_all(&app.pool).await.unwrap().is_empty());
    assert!(EventMessageRepo::list_all(&app.pool).await.unwrap().is_empty());
    assert!(events.list_events().await.is_empty());
}

#[tokio::test]
async fn event_teardown_stops_at_the_first_bridge_failure() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 20.0, al.player.id).await;
    app.state
        .events
        .add_member(skins.event.id, bo.player.id, true)
        .await
        .unwrap();
    app.bridge.fail_next(BridgeOp::DeleteChannel).await;

    let result = app.state.events.delete_event(skins.event.id).await;

    assert_matches!(
        result,
        Err(AppError::Bridge(BridgeError::Rejected { operation: BridgeOp::DeleteChannel, .. }))
    );
    // Members were released and their rows dropped; the event waits for a retry.
    assert_eq!(app.bridge.live_subscription_count().await, 0);
    assert!(app.bridge.channel_exists(&skins.event.topic).await);
    assert!(EventRepo::find_by_id(&app.pool, skins.event.id).await.unwrap().is_some());
    assert!(EventMemberRepo::list_for_event(&app.pool, skins.event.id)
        .await
        .unwrap()
        .is_empty());

    app.state.events.delete_event(skins.event.id).await.unwrap();

    assert!(!app.bridge.channel_exists(&skins.event.topic).await);
    assert!(EventRepo::find_by_id(&app.pool, skins.event.id).await.unwrap().is_none());
    assert!(app.state.events.list_events().await.is_empty());
    let notice = "You have been removed from event Skins. The event is being deleted.";
    let notices = app.bridge.texts_to(BO_PHONE).await;
    assert_eq!(notices.iter().filter(|t| t.as_str() == notice).count(), 1);
}

#[tokio::test]
async fn an_event_whose_channel_is_already_gone_can_still_be_deleted() {
    let app = TestApp::new().await;
    let (al, bo, _) = club(&app).await;
    let skins = app.event("Skins", 20.0, al.player.id).await;
    app.state
        .events
        .add_member(skins.event.id, bo.player.id, true)
        .await
        .unwrap();
    // Deleting the channel out of band also drops its subscriptions.
    app.bridge
        .delete_channel(&ChannelHandle::new(skins.event.topic.clone()))
        .await
        .unwrap();

    app.state.events.delete_event(skins.event.id).await.unwrap();

    assert!(EventRepo::find_by_id(&app.pool, skins.event.id).await.unwrap().is_none());
    assert!(EventMemberRepo::list_all(&app.pool).await.unwrap().is_empty());
    assert_eq!(app.bridge.count(BridgeOp::SendToRecipient).await, 4);
}

#[tokio::test]
async fn deleting_a_missing_event_is_not_found() {
    let app = TestApp::new().await;

    assert_matches!(
        app.state.events.delete_event(7).await,
        Err(AppError::Core(CoreError::NotFound { entity: "Event", id: 7 }))
    );
}
