//! # Item State Machine
//!
//! The five-state custody automaton. This table is the single authority on
//! which `(state, event)` pairs are legal; preconditions layer on top in
//! `preconditions`.
//!
//! ```text
//! (initial) --ITEM_MINTED--> MINTED
//! MINTED --ITEM_ASSIGNED--> ACTIVE_HELD
//! MINTED --ITEM_MOVED_TO_CUSTODY--> IN_CUSTODY
//! MINTED --ITEM_BURNED--> BURNED
//! ACTIVE_HELD --ITEM_LOCKED--> LOCKED_IN_ESCROW
//! ACTIVE_HELD --ITEM_MOVED_TO_CUSTODY--> IN_CUSTODY
//! ACTIVE_HELD --ITEM_BURNED--> BURNED
//! LOCKED_IN_ESCROW --ITEM_SETTLED--> ACTIVE_HELD
//! LOCKED_IN_ESCROW --ITEM_UNLOCKED_EXPIRED--> ACTIVE_HELD
//! LOCKED_IN_ESCROW --ITEM_BURNED--> BURNED
//! IN_CUSTODY --ITEM_ASSIGNED--> ACTIVE_HELD
//! IN_CUSTODY --ITEM_BURNED--> BURNED
//! ```
//!
//! `ITEM_AUTHENTICATED` is legal in every live state and leaves the state
//! unchanged. Registration events are not item transitions and always
//! return `None` here.

use shared_types::{EventKind, ItemState};

/// Next state for `(state, event-kind)`, or `None` when the pair is
/// disallowed. `state = None` is the pre-mint initial state.
pub fn transition(state: Option<ItemState>, kind: EventKind) -> Option<ItemState> {
    use EventKind::*;
    use ItemState::*;

    match (state, kind) {
        (None, ItemMinted) => Some(Minted),

        (Some(Minted), ItemAssigned) => Some(ActiveHeld),
        (Some(Minted), ItemMovedToCustody) => Some(InCustody),
        (Some(Minted), ItemBurned) => Some(Burned),

        (Some(ActiveHeld), ItemLocked) => Some(LockedInEscrow),
        (Some(ActiveHeld), ItemMovedToCustody) => Some(InCustody),
        (Some(ActiveHeld), ItemBurned) => Some(Burned),

        (Some(LockedInEscrow), ItemSettled) => Some(ActiveHeld),
        (Some(LockedInEscrow), ItemUnlockedExpired) => Some(ActiveHeld),
        (Some(LockedInEscrow), ItemBurned) => Some(Burned),

        (Some(InCustody), ItemAssigned) => Some(ActiveHeld),
        (Some(InCustody), ItemBurned) => Some(Burned),

        // Attestations never move the automaton.
        (Some(current), ItemAuthenticated) if !current.is_terminal() => Some(current),

        _ => None,
    }
}
