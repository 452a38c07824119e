//! # Fee Distribution
//!
//! Splits a settlement's total fee across the committee: everyone gets
//! `⌊total / K⌋`, and the `total mod K` top-ranked seats get one extra
//! satoshi each. The split is exact; nothing is ever burned or created.

use serde::{Deserialize, Serialize};

use crate::selection::CommitteeSeat;
use shared_types::OperatorId;

/// One operator's share of a settlement fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePayout {
    pub operator_id: OperatorId,
    pub amount_sats: u64,
}

/// Distribute `total_fee_sats` across the ranked committee.
pub fn distribute_fees(total_fee_sats: u64, committee: &[CommitteeSeat]) -> Vec<FeePayout> {
    if committee.is_empty() {
        return vec![];
    }
    let k = committee.len() as u64;
    let base = total_fee_sats / k;
    let remainder = (total_fee_sats % k) as usize;

    committee
        .iter()
        .enumerate()
        .map(|(rank, seat)| FeePayout {
            operator_id: seat.operator_id.clone(),
            amount_sats: if rank < remainder { base + 1 } else { base },
        })
        .collect()
}
