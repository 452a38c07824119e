//! Shared fixtures: a 3-of-5 federation driven through the canonical
//! register → mint → assign → lock → settle story.

use std::sync::Arc;

use pc_01_event_store::{EventStore, InMemoryKVStore};
use pc_02_admission::test_utils::{
    assign, lock, manufacturer_registration, mint, settle, ActorKey, ManualClock, TestFederation,
    GENESIS_MS,
};
use pc_02_admission::AdmissionPipeline;
use shared_types::{Event, Item, ItemId, Timestamp};

pub const PRICE_SATS: u64 = 50_000_000;
pub const LOCK_EXPIRY_MS: Timestamp = GENESIS_MS + 3_600_000;

pub struct SaleFixture {
    pub federation: TestFederation,
    pub pipeline: AdmissionPipeline<InMemoryKVStore, ManualClock>,
    pub issuer: ActorKey,
    pub owner: ActorKey,
    pub buyer: ActorKey,
    pub registration: Event,
    pub item_id: ItemId,
}

impl SaleFixture {
    pub fn store(&self) -> &Arc<EventStore<InMemoryKVStore>> {
        self.pipeline.store()
    }

    pub fn item(&self) -> Item {
        self.store()
            .item(&self.item_id)
            .expect("store read")
            .expect("item exists")
    }

    pub fn admit(&self, mut event: Event, signatures: usize) -> Result<(), String> {
        self.federation.quorum_sign(&mut event, signatures);
        self.pipeline
            .admit(&event)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Register "Luxury Watch Co." and mint the Chronograph Elite X1.
pub fn minted_fixture() -> SaleFixture {
    let federation = TestFederation::new(3, 5);
    let pipeline = federation.pipeline();
    let issuer = ActorKey::from_seed(1);
    let owner = ActorKey::from_seed(2);
    let buyer = ActorKey::from_seed(3);

    let registration =
        manufacturer_registration("mfr-lwc", "Luxury Watch Co.", &issuer, GENESIS_MS);
    let mut signed = registration.clone();
    federation.quorum_sign(&mut signed, 3);
    pipeline.admit(&signed).unwrap();

    let mut minted = mint(
        &registration,
        &issuer,
        b"Chronograph Elite X1|LWC-2024-001234",
        GENESIS_MS + 1_000,
    );
    federation.quorum_sign(&mut minted, 3);
    let receipt = pipeline.admit(&minted).unwrap();

    SaleFixture {
        federation,
        pipeline,
        issuer,
        owner,
        buyer,
        registration,
        item_id: receipt.item_id,
    }
}

/// `minted_fixture` plus the assignment to the first owner (height 3).
pub fn assigned_fixture() -> SaleFixture {
    let fixture = minted_fixture();
    let assigned = assign(
        &fixture.item(),
        &fixture.issuer,
        &fixture.owner,
        GENESIS_MS + 2_000,
    );
    fixture.admit(assigned, 3).unwrap();
    fixture
}

/// `assigned_fixture` plus the escrow lock (height 4).
pub fn locked_fixture() -> SaleFixture {
    let fixture = assigned_fixture();
    let locked = lock(
        &fixture.item(),
        &fixture.owner,
        "offer-abc",
        &fixture.buyer.wallet(),
        PRICE_SATS,
        LOCK_EXPIRY_MS,
        GENESIS_MS + 3_000,
    );
    fixture.admit(locked, 3).unwrap();
    fixture
}

/// The full settled sale (height 5, owner = buyer).
pub fn settled_fixture() -> SaleFixture {
    let fixture = locked_fixture();
    let settled = settle(&fixture.item(), &fixture.buyer, GENESIS_MS + 10_000);
    fixture.admit(settled, 3).unwrap();
    fixture
}
