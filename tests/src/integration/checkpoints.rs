//! Checkpoint commitments: Merkle behavior and the Bitcoin-visible
//! footprint, verified the way an outside observer would.

use async_trait::async_trait;
use parking_lot::Mutex;

use pc_04_checkpoint::{
    build_unsigned, op_return_script, parse_op_return, AnchorConfirmation, AnchorError,
    AnchorSink, AnchorTx, CheckpointEngine, CheckpointSigner, LocalSigner, SignerGatewayError,
};
use shared_crypto::{build_proof, merkle_root, sha256, verify_proof};
use shared_types::{Checkpoint, OperatorId, OperatorSignature};

use super::helpers::settled_fixture;
use pc_01_event_store::TimeSource;

#[test]
fn merkle_roundtrip_and_sensitivity() {
    let leaves: Vec<[u8; 32]> = (0u8..11).map(|i| sha256(&[i])).collect();
    let root = merkle_root(&leaves);

    for (i, leaf) in leaves.iter().enumerate() {
        let proof = build_proof(&leaves, i).unwrap();
        assert!(verify_proof(leaf, &proof, &root));
        // The same proof cannot vouch for a different leaf.
        assert!(!verify_proof(&sha256(b"other"), &proof, &root));
    }

    let mut extended = leaves.clone();
    extended.push(sha256(b"new"));
    assert_ne!(merkle_root(&extended), root);
    assert_ne!(merkle_root(&leaves[..10]), root);
}

struct FederationPeers {
    signatures: Vec<(OperatorId, shared_crypto::Secp256k1KeyPair)>,
}

#[async_trait]
impl CheckpointSigner for FederationPeers {
    async fn gather_signatures(
        &self,
        checkpoint: &Checkpoint,
    ) -> Result<Vec<OperatorSignature>, SignerGatewayError> {
        let hash = checkpoint.checkpoint_hash();
        Ok(self
            .signatures
            .iter()
            .map(|(id, key)| OperatorSignature {
                operator_id: id.clone(),
                public_key: *key.public_key().as_bytes(),
                signature: *key.sign_digest(&hash).as_bytes(),
            })
            .collect())
    }
}

#[derive(Default)]
struct RecordingAnchor {
    scripts: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl AnchorSink for RecordingAnchor {
    async fn submit_checkpoint_anchor(
        &self,
        _checkpoint: &Checkpoint,
        script: &[u8],
    ) -> Result<AnchorTx, AnchorError> {
        self.scripts.lock().push(script.to_vec());
        Ok(AnchorTx {
            txid: "f00d".repeat(16),
            raw_tx: vec![],
        })
    }

    async fn confirmation_lookup(
        &self,
        _txid: &str,
    ) -> Result<Option<AnchorConfirmation>, AnchorError> {
        Ok(Some(AnchorConfirmation {
            block_height: 830_123,
            block_hash: "00".repeat(32),
        }))
    }
}

#[tokio::test]
async fn observer_can_verify_an_anchored_checkpoint() {
    let fixture = settled_fixture();
    let store = fixture.store().clone();
    let federation = &fixture.federation;

    let engine = CheckpointEngine::new(
        store.clone(),
        FederationPeers {
            signatures: (1..3)
                .map(|i| (OperatorId::new(format!("op-{i}")), federation.operator_key(i)))
                .collect(),
        },
        RecordingAnchor::default(),
        federation.clock.clone(),
        LocalSigner {
            operator_id: OperatorId::new("op-0"),
            keypair: federation.operator_key(0),
        },
        federation.registry(),
        federation.config.clone(),
    );

    let checkpoint = engine.run_once().await.unwrap().expect("events to commit");
    assert_eq!(checkpoint.event_count, 5); // registration + four item events
    assert_eq!(checkpoint.bitcoin_tx_id.as_deref(), Some(&*"f00d".repeat(16)));
    assert_eq!(checkpoint.block_height, Some(830_123));

    // An observer re-derives everything from the admitted events and the
    // on-chain script.
    let event_ids = store.admitted_range(0, checkpoint.event_count).unwrap();
    assert_eq!(merkle_root(&event_ids), checkpoint.merkle_root);
    for (i, id) in event_ids.iter().enumerate() {
        let proof = build_proof(&event_ids, i).unwrap();
        assert!(verify_proof(id, &proof, &checkpoint.merkle_root));
    }

    let script = op_return_script(&checkpoint.checkpoint_hash(), &checkpoint.operator_signatures);
    let parsed = parse_op_return(&script).unwrap();
    assert_eq!(parsed.checkpoint_hash, checkpoint.checkpoint_hash());
    assert_eq!(parsed.sig_count as usize, checkpoint.operator_signatures.len());
    assert!(pc_04_checkpoint::commits_to(&script, &checkpoint));
}

#[tokio::test]
async fn successive_checkpoints_link() {
    let fixture = settled_fixture();
    let store = fixture.store().clone();

    let first = build_unsigned(&store, fixture.federation.clock.now_ms()).unwrap().unwrap();
    let mut signed = first.clone();
    signed.operator_signatures = fixture
        .federation
        .quorum_sign_hash(&first.checkpoint_hash(), 3);
    store.put_checkpoint(&signed).unwrap();

    // Nothing new: no second checkpoint.
    assert!(build_unsigned(&store, fixture.federation.clock.now_ms() + 1)
        .unwrap()
        .is_none());

    // Admit one more event; the next checkpoint chains onto the first.
    let item = fixture.item();
    let authenticated = pc_02_admission::test_utils::authenticate(
        &item,
        "auth-gem",
        &pc_02_admission::test_utils::ActorKey::from_seed(4),
        0.99,
        pc_02_admission::test_utils::GENESIS_MS + 30_000,
    );
    // The authenticator must exist first.
    let registration = pc_02_admission::test_utils::authenticator_registration(
        "auth-gem",
        "Gem Lab",
        "horology",
        &pc_02_admission::test_utils::ActorKey::from_seed(4),
        pc_02_admission::test_utils::GENESIS_MS + 29_000,
    );
    fixture.admit(registration, 3).unwrap();
    fixture.admit(authenticated, 3).unwrap();

    let second = build_unsigned(&store, fixture.federation.clock.now_ms() + 2)
        .unwrap()
        .unwrap();
    assert_eq!(second.event_count, 2);
    assert_eq!(second.previous_checkpoint_hash, first.checkpoint_hash());
}
