//! End-to-end custody flows over one operator's pipeline.

use pc_02_admission::test_utils::{unlock_expired, GENESIS_MS};
use shared_types::ItemState;

use super::helpers::{
    assigned_fixture, locked_fixture, settled_fixture, LOCK_EXPIRY_MS, PRICE_SATS,
};

#[test]
fn mint_and_assign() {
    let fixture = assigned_fixture();
    let item = fixture.item();

    assert_eq!(item.current_state, ItemState::ActiveHeld);
    assert_eq!(item.current_owner_wallet, Some(fixture.owner.wallet()));
    assert_eq!(item.last_event_height, 3);

    // Registration, mint, and assignment form one chained log.
    let events = fixture.store().events(&fixture.item_id).unwrap();
    assert_eq!(events.len(), 3);
    for (i, pair) in events.windows(2).enumerate() {
        assert_eq!(
            pair[1].header.previous_event_hash, pair[0].header.event_id,
            "link {i}"
        );
        assert_eq!(pair[1].header.height, pair[0].header.height + 1);
    }
}

#[test]
fn happy_path_sale() {
    let fixture = settled_fixture();
    let item = fixture.item();

    assert_eq!(item.current_state, ItemState::ActiveHeld);
    assert_eq!(item.current_owner_wallet, Some(fixture.buyer.wallet()));
    assert_eq!(item.last_event_height, 5);
    assert!(item.active_lock.is_none());

    let events = fixture.store().events(&fixture.item_id).unwrap();
    assert_eq!(events.len(), 5);
}

#[test]
fn expired_lock_returns_to_seller() {
    let fixture = locked_fixture();
    let item = fixture.item();
    assert_eq!(item.current_state, ItemState::LockedInEscrow);
    assert_eq!(item.active_lock.as_ref().unwrap().price_sats, PRICE_SATS);

    // One second past expiry, the seller reclaims the item.
    let now = LOCK_EXPIRY_MS + 1_000;
    fixture.federation.clock.set(now);
    let unlock = unlock_expired(&item, &fixture.owner, now);
    fixture.admit(unlock, 3).unwrap();

    let item = fixture.item();
    assert_eq!(item.current_state, ItemState::ActiveHeld);
    assert_eq!(item.current_owner_wallet, Some(fixture.owner.wallet()));
    assert_eq!(item.last_event_height, 5);
    assert!(item.active_lock.is_none());
}

#[test]
fn settle_after_expiry_still_wins_if_first() {
    // The lock's expiry gates UNLOCK, not SETTLE; whichever event is
    // admitted first at height 5 owns the log position.
    let fixture = locked_fixture();
    let locked_item = fixture.item();
    let stale_unlock = unlock_expired(&locked_item, &fixture.owner, LOCK_EXPIRY_MS + 1);

    let settled =
        pc_02_admission::test_utils::settle(&locked_item, &fixture.buyer, GENESIS_MS + 20_000);
    fixture.admit(settled, 3).unwrap();

    // The unlock now competes for an already-taken height.
    fixture.federation.clock.set(LOCK_EXPIRY_MS + 1);
    assert!(fixture.admit(stale_unlock, 3).is_err());
}
