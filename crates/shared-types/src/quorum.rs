//! # Operator Registry & Quorum Counting
//!
//! The configured N-operator federation and the M-of-N signature rules
//! every admitted artifact must satisfy.

use std::collections::{HashMap, HashSet};

use crate::entities::{Hash, Operator, OperatorId, OperatorSignature, OperatorStatus};
use shared_crypto::ecdsa::verify_digest;

/// The configured set of federation operators.
///
/// Lookup is by `operatorId`; a signature from a key not listed here never
/// counts toward quorum.
#[derive(Clone, Debug, Default)]
pub struct OperatorRegistry {
    operators: Vec<Operator>,
    by_id: HashMap<OperatorId, usize>,
}

impl OperatorRegistry {
    pub fn new(operators: Vec<Operator>) -> Self {
        let by_id = operators
            .iter()
            .enumerate()
            .map(|(i, op)| (op.operator_id.clone(), i))
            .collect();
        Self { operators, by_id }
    }

    pub fn get(&self, id: &OperatorId) -> Option<&Operator> {
        self.by_id.get(id).map(|&i| &self.operators[i])
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operator> {
        self.operators.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &Operator> {
        self.operators
            .iter()
            .filter(|op| op.status == OperatorStatus::Active)
    }
}

/// Outcome of checking a signature set against the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignatureTally {
    /// Distinct operators with a valid signature over the message.
    pub valid: usize,
    /// Signatures from operator ids already counted.
    pub duplicates: usize,
    /// Signatures from ids not in the registry, or with a key that does
    /// not match the registered one.
    pub unknown: usize,
    /// Signatures that failed ECDSA verification.
    pub invalid: usize,
}

impl SignatureTally {
    pub fn meets(&self, quorum_m: usize) -> bool {
        self.valid >= quorum_m
    }
}

/// Count distinct valid operator signatures over a 32-byte message.
///
/// Each signature must come from a registered operator, under that
/// operator's registered key; duplicates by `operatorId` do not count.
pub fn tally_signatures(
    message: &Hash,
    signatures: &[OperatorSignature],
    registry: &OperatorRegistry,
) -> SignatureTally {
    let mut tally = SignatureTally::default();
    let mut seen: HashSet<&OperatorId> = HashSet::new();

    for sig in signatures {
        let Some(operator) = registry.get(&sig.operator_id) else {
            tally.unknown += 1;
            continue;
        };
        if operator.public_key != sig.public_key {
            tally.unknown += 1;
            continue;
        }
        if !seen.insert(&sig.operator_id) {
            tally.duplicates += 1;
            continue;
        }
        if verify_digest(&sig.public_key, message, &sig.signature) {
            tally.valid += 1;
        } else {
            tally.invalid += 1;
        }
    }
    tally
}
