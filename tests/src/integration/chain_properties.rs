//! Per-item chain invariants over pipeline-produced logs.

use shared_types::ZERO_HASH;

use super::helpers::settled_fixture;

#[test]
fn logs_are_gapless_linked_and_monotone() {
    let fixture = settled_fixture();
    let events = fixture.store().events(&fixture.item_id).unwrap();
    assert_eq!(events.len(), 5);

    assert_eq!(events[0].header.previous_event_hash, ZERO_HASH);
    assert_eq!(events[0].header.height, 1);

    for (i, pair) in events.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        assert_eq!(next.header.previous_event_hash, prev.header.event_id, "link {i}");
        assert_eq!(next.header.height, prev.header.height + 1, "height {i}");
        assert!(
            next.header.timestamp >= prev.header.timestamp,
            "timestamp {i}"
        );
    }

    // The snapshot mirrors the log tip.
    let item = fixture.item();
    let tip = events.last().unwrap();
    assert_eq!(item.last_event_hash, tip.header.event_id);
    assert_eq!(item.last_event_height, tip.header.height);
}

#[test]
fn every_stored_event_is_content_addressed() {
    let fixture = settled_fixture();
    for event in fixture.store().events(&fixture.item_id).unwrap() {
        assert!(event.id_is_consistent());
        let stored = fixture
            .store()
            .event(&event.header.event_id)
            .unwrap()
            .expect("blob exists");
        assert_eq!(stored, event);
    }
}
