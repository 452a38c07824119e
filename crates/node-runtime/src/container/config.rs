//! # Node Configuration
//!
//! Unified configuration for one operator node: protocol parameters,
//! storage, identity, and the federation roster.

use serde::{Deserialize, Serialize};

use shared_crypto::Secp256k1KeyPair;
use shared_types::{
    ConfigError, CoreConfig, Operator, OperatorId, OperatorStatus, WalletAddress,
};

/// Complete node configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Protocol parameters.
    pub core: CoreConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// This operator's identity.
    pub identity: IdentityConfig,
    /// The full federation roster, this operator included.
    pub operators: Vec<OperatorEntry>,
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// RocksDB directory.
    pub data_dir: String,
    /// Use the in-memory backend instead (development only).
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data/pc-node".to_string(),
            in_memory: false,
        }
    }
}

/// The local operator's signing identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    pub operator_id: String,
    /// Hex-encoded secp256k1 secret key.
    pub secret_key_hex: String,
}

/// One federation member as configured.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorEntry {
    pub operator_id: String,
    /// Hex-encoded compressed public key (33 bytes).
    pub public_key_hex: String,
    pub payout_address: String,
    pub endpoint: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NodeConfig {
    /// Load and validate a JSON config file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: NodeConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.core.validate()?;
        if self.operators.len() != self.core.quorum_n {
            return Err(ConfigError::Invalid(format!(
                "{} operators configured for quorumN = {}",
                self.operators.len(),
                self.core.quorum_n
            )));
        }
        if !self
            .operators
            .iter()
            .any(|op| op.operator_id == self.identity.operator_id)
        {
            return Err(ConfigError::Invalid(format!(
                "identity {} is not in the operator roster",
                self.identity.operator_id
            )));
        }
        let keypair = self.keypair()?;
        let own = self
            .operators
            .iter()
            .find(|op| op.operator_id == self.identity.operator_id)
            .expect("roster membership checked above");
        if own.public_key_hex != hex::encode(keypair.public_key().as_bytes()) {
            return Err(ConfigError::Invalid(
                "secret key does not match the roster's public key".into(),
            ));
        }
        Ok(())
    }

    /// The local signing keypair.
    pub fn keypair(&self) -> Result<Secp256k1KeyPair, ConfigError> {
        Secp256k1KeyPair::from_hex(&self.identity.secret_key_hex)
            .map_err(|_| ConfigError::InvalidSecretKey)
    }

    /// The roster as typed operator records.
    pub fn roster(&self) -> Result<Vec<Operator>, ConfigError> {
        self.operators
            .iter()
            .map(|entry| {
                let mut public_key = [0u8; 33];
                let decoded = hex::decode(&entry.public_key_hex)
                    .map_err(|_| ConfigError::Invalid(format!(
                        "operator {} public key is not hex",
                        entry.operator_id
                    )))?;
                if decoded.len() != 33 {
                    return Err(ConfigError::Invalid(format!(
                        "operator {} public key must be 33 bytes",
                        entry.operator_id
                    )));
                }
                public_key.copy_from_slice(&decoded);
                Ok(Operator {
                    operator_id: OperatorId::new(entry.operator_id.clone()),
                    public_key,
                    payout_address: WalletAddress::new(entry.payout_address.clone()),
                    endpoint: entry.endpoint.clone(),
                    status: if entry.active {
                        OperatorStatus::Active
                    } else {
                        OperatorStatus::Inactive
                    },
                })
            })
            .collect()
    }
}
