//! # OP_RETURN Commitment Layout
//!
//! The Bitcoin-visible footprint of a checkpoint, bit-exact:
//!
//! ```text
//! <0x6a> <pushdata-len> <checkpointHash:32> <sigCount:1>
//!        <sigPrefix1:32> <sigPrefix2:32> <sigPrefix3:32>
//! ```
//!
//! A signature prefix is the first 32 bytes (the `r` component) of an
//! operator signature; slots beyond the available signatures are zero.

use shared_types::{Checkpoint, Hash, OperatorSignature};

const OP_RETURN: u8 = 0x6a;
const DATA_LEN: usize = 32 + 1 + 3 * 32;

/// Parsed OP_RETURN commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpReturnCommitment {
    pub checkpoint_hash: Hash,
    pub sig_count: u8,
    pub sig_prefixes: [[u8; 32]; 3],
}

/// Build the full OP_RETURN script for a signed checkpoint.
pub fn op_return_script(checkpoint_hash: &Hash, signatures: &[OperatorSignature]) -> Vec<u8> {
    let mut script = Vec::with_capacity(2 + DATA_LEN);
    script.push(OP_RETURN);
    script.push(DATA_LEN as u8);
    script.extend_from_slice(checkpoint_hash);
    script.push(signatures.len().min(u8::MAX as usize) as u8);
    for slot in 0..3 {
        match signatures.get(slot) {
            Some(sig) => script.extend_from_slice(&sig.signature[..32]),
            None => script.extend_from_slice(&[0u8; 32]),
        }
    }
    script
}

/// Parse an OP_RETURN script back into its commitment, if well-formed.
pub fn parse_op_return(script: &[u8]) -> Option<OpReturnCommitment> {
    if script.len() != 2 + DATA_LEN || script[0] != OP_RETURN || script[1] as usize != DATA_LEN {
        return None;
    }
    let data = &script[2..];
    let mut checkpoint_hash = [0u8; 32];
    checkpoint_hash.copy_from_slice(&data[..32]);
    let sig_count = data[32];
    let mut sig_prefixes = [[0u8; 32]; 3];
    for (i, prefix) in sig_prefixes.iter_mut().enumerate() {
        prefix.copy_from_slice(&data[33 + i * 32..33 + (i + 1) * 32]);
    }
    Some(OpReturnCommitment {
        checkpoint_hash,
        sig_count,
        sig_prefixes,
    })
}

/// Check that a script commits to the given checkpoint.
pub fn commits_to(script: &[u8], checkpoint: &Checkpoint) -> bool {
    parse_op_return(script)
        .map(|c| c.checkpoint_hash == checkpoint.checkpoint_hash())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::OperatorId;

    fn signature(fill: u8) -> OperatorSignature {
        OperatorSignature {
            operator_id: OperatorId::new(format!("op-{fill}")),
            public_key: [2u8; 33],
            signature: [fill; 64],
        }
    }

    #[test]
    fn script_layout_is_bit_exact() {
        let hash = [0xCD; 32];
        let sigs = vec![signature(1), signature(2), signature(3), signature(4)];
        let script = op_return_script(&hash, &sigs);

        assert_eq!(script.len(), 131);
        assert_eq!(script[0], 0x6a);
        assert_eq!(script[1], 129);
        assert_eq!(&script[2..34], &[0xCD; 32]);
        assert_eq!(script[34], 4); // sigCount counts all, prefixes cap at 3
        assert_eq!(&script[35..67], &[1u8; 32]);
        assert_eq!(&script[67..99], &[2u8; 32]);
        assert_eq!(&script[99..131], &[3u8; 32]);
    }

    #[test]
    fn missing_slots_are_zero() {
        let script = op_return_script(&[0u8; 32], &[signature(9)]);
        assert_eq!(&script[35..67], &[9u8; 32]);
        assert_eq!(&script[67..99], &[0u8; 32]);
        assert_eq!(&script[99..131], &[0u8; 32]);
    }

    #[test]
    fn parse_roundtrip() {
        let hash = [0xAB; 32];
        let sigs = vec![signature(7), signature(8), signature(9)];
        let script = op_return_script(&hash, &sigs);
        let parsed = parse_op_return(&script).unwrap();
        assert_eq!(parsed.checkpoint_hash, hash);
        assert_eq!(parsed.sig_count, 3);
        assert_eq!(parsed.sig_prefixes[2], [9u8; 32]);
    }

    #[test]
    fn malformed_scripts_are_rejected() {
        assert!(parse_op_return(&[]).is_none());
        assert!(parse_op_return(&[0x6a, 10, 0, 0]).is_none());
        let mut script = op_return_script(&[0u8; 32], &[]);
        script[0] = 0x51;
        assert!(parse_op_return(&script).is_none());
    }
}
