//! Committee determinism and the fee-split vectors.

use pc_05_committee::{distribute_fees, select_committee, verify_selection};
use shared_types::{OfferId, Operator, OperatorId, OperatorStatus, WalletAddress};

fn operators(n: usize) -> Vec<Operator> {
    (0..n)
        .map(|i| Operator {
            operator_id: OperatorId::new(format!("op-{i}")),
            public_key: [2u8; 33],
            payout_address: WalletAddress::new(format!("1Payout{i}")),
            endpoint: format!("https://op-{i}.federation.example"),
            status: OperatorStatus::Active,
        })
        .collect()
}

const CHECKPOINT_ROOT: [u8; 32] = [0xFF; 32];

#[test]
fn selection_is_byte_reproducible() {
    let ops = operators(5);
    let offer = OfferId::from("offer-abc");

    let first =
        select_committee(&offer, &CHECKPOINT_ROOT, "bitcoin-mainnet", &ops, 5, 3).unwrap();
    let second =
        select_committee(&offer, &CHECKPOINT_ROOT, "bitcoin-mainnet", &ops, 5, 3).unwrap();
    assert_eq!(first, second);

    // Permuting the active set does not change the outcome.
    let mut permuted = ops.clone();
    permuted.rotate_left(2);
    permuted.swap(0, 3);
    let third =
        select_committee(&offer, &CHECKPOINT_ROOT, "bitcoin-mainnet", &permuted, 5, 3).unwrap();
    assert_eq!(first, third);

    // And the claim re-verifies from the original inputs alone.
    let ids: Vec<OperatorId> = first.iter().map(|s| s.operator_id.clone()).collect();
    assert!(verify_selection(
        &offer,
        &CHECKPOINT_ROOT,
        "bitcoin-mainnet",
        &ops,
        5,
        3,
        &ids
    ));
}

#[test]
fn chain_id_separates_networks() {
    let ops = operators(8);
    let offer = OfferId::from("offer-abc");
    let mainnet =
        select_committee(&offer, &CHECKPOINT_ROOT, "bitcoin-mainnet", &ops, 3, 3).unwrap();
    let testnet =
        select_committee(&offer, &CHECKPOINT_ROOT, "bitcoin-testnet", &ops, 3, 3).unwrap();
    // Scores are reseeded per chain id; identical committees in the same
    // order would mean the id was ignored.
    assert_ne!(
        mainnet.iter().map(|s| &s.score).collect::<Vec<_>>(),
        testnet.iter().map(|s| &s.score).collect::<Vec<_>>()
    );
}

#[test]
fn fee_vectors() {
    let ops = operators(5);
    let committee = select_committee(
        &OfferId::from("offer-abc"),
        &CHECKPOINT_ROOT,
        "bitcoin-mainnet",
        &ops,
        5,
        3,
    )
    .unwrap();

    let even = distribute_fees(7_500, &committee);
    assert_eq!(
        even.iter().map(|p| p.amount_sats).collect::<Vec<_>>(),
        vec![1_500; 5]
    );

    let uneven = distribute_fees(7_503, &committee);
    assert_eq!(
        uneven.iter().map(|p| p.amount_sats).collect::<Vec<_>>(),
        vec![1_501, 1_501, 1_501, 1_500, 1_500]
    );
    // The extra satoshis follow the ranking, not the roster order.
    for (payout, seat) in uneven.iter().zip(&committee) {
        assert_eq!(payout.operator_id, seat.operator_id);
    }
}
