// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! FHE instance provider.
//!
//! The FHE backend is an external collaborator; this module declares the
//! contract the application makes with it and the two implementations:
//! a deterministic local mock ([`mock::MockFhevm`], chain 31337 only) and a
//! thin HTTP client for the production relayer ([`relayer::RelayerFhevm`]).
//! Everything mock-specific is captured in [`FhevmCapabilities`], resolved
//! once at construction; the decrypt path never compares chain IDs inline.

pub mod auth;
pub mod keypair;
pub mod mock;
pub mod relayer;

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256};

pub use auth::{adjust_signature, DecryptAuthorization};
pub use keypair::{DecryptionKeypair, KeyMaterial};
pub use mock::MockFhevm;
pub use relayer::RelayerFhevm;

/// Chain ID served by the deterministic mock backend.
pub const MOCK_CHAIN_ID: u64 = 31337;

/// Errors from the FHE instance provider.
#[derive(Debug, thiserror::Error)]
pub enum FhevmError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("keypair material invalid: {0}")]
    Keypair(String),

    #[error("signature invalid: {0}")]
    Signature(String),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("relayer request failed: {0}")]
    Relayer(String),

    #[error("no FHE backend available for chain {0}")]
    UnsupportedChain(u64),
}

/// Construction parameters for an FHE instance.
#[derive(Debug, Clone)]
pub struct FhevmConfig {
    /// JSON-RPC endpoint the backend is bound to.
    pub rpc_url: String,
    /// Chain ID the backend serves.
    pub chain_id: u64,
    /// ACL contract address.
    pub acl_address: Address,
    /// Input verifier contract address.
    pub input_verifier_address: Address,
    /// KMS verifier contract address.
    pub kms_verifier_address: Address,
    /// Relayer base URL; required for non-mock chains.
    pub relayer_url: Option<String>,
}

/// Backend capabilities, resolved once at construction.
///
/// Centralizes the behavioral differences between the mock and the real
/// relayer so callers branch on capability, never on chain ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FhevmCapabilities {
    /// Deterministic development backend with no privacy guarantee.
    pub mock: bool,
    /// Backend expects the decryption signature hex without its `0x` prefix.
    pub strip_signature_prefix: bool,
}

impl FhevmCapabilities {
    /// Capabilities of the local mock backend.
    pub const MOCK: Self = Self {
        mock: true,
        strip_signature_prefix: true,
    };

    /// Capabilities of the production relayer.
    pub const RELAYER: Self = Self {
        mock: false,
        strip_signature_prefix: false,
    };
}

/// One plaintext batch bound to a (contract, user) pair, pending encryption.
///
/// Created per submission and discarded once handles are extracted.
#[derive(Debug, Clone)]
pub struct EncryptedInput {
    pub contract: Address,
    pub user: Address,
    pub values: Vec<u32>,
}

impl EncryptedInput {
    /// Start an input bound to (contract, user).
    pub fn bind(contract: Address, user: Address) -> Self {
        Self {
            contract,
            user,
            values: Vec::new(),
        }
    }

    /// Append a 32-bit plaintext to the batch.
    pub fn add32(mut self, value: u32) -> Self {
        self.values.push(value);
        self
    }
}

/// Result of encrypting an input batch: one opaque handle per value plus the
/// backend's input proof.
#[derive(Debug, Clone)]
pub struct CiphertextHandles {
    pub handles: Vec<B256>,
    pub input_proof: Vec<u8>,
}

/// One (handle, contract) pair targeted by a decryption request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleContractPair {
    pub handle: B256,
    pub contract: Address,
}

/// A user-decryption request: the signed authorization plus the session
/// keypair and target handles.
#[derive(Debug, Clone)]
pub struct UserDecryptRequest {
    pub handle_pairs: Vec<HandleContractPair>,
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
    /// Hex signature, already adjusted for the backend's prefix convention.
    pub signature: String,
    pub contract_addresses: Vec<Address>,
    pub user: Address,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

/// Decrypted plaintexts keyed by ciphertext handle.
///
/// Lookup is explicit-absent: a handle the backend did not return yields
/// `None`, never a defaulted zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptedValues(BTreeMap<B256, u64>);

impl DecryptedValues {
    pub fn insert(&mut self, handle: B256, value: u64) {
        self.0.insert(handle, value);
    }

    /// Plaintext for a handle, if the backend revealed it.
    pub fn value(&self, handle: B256) -> Option<u64> {
        self.0.get(&handle).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The contract this application makes with the FHE backend.
#[allow(async_fn_in_trait)]
pub trait Fhevm {
    /// Behavioral capabilities of this backend.
    fn capabilities(&self) -> FhevmCapabilities;

    /// Generate a fresh ephemeral decryption keypair. Never reused across
    /// sessions. Async because the relayer delegates generation to its
    /// gateway; the mock resolves immediately.
    async fn generate_keypair(&self) -> Result<DecryptionKeypair, FhevmError>;

    /// Encrypt a plaintext batch, yielding one handle per value.
    async fn encrypt_input(&self, input: EncryptedInput) -> Result<CiphertextHandles, FhevmError>;

    /// Execute a user-decryption under a signed EIP-712 authorization.
    async fn user_decrypt(&self, request: UserDecryptRequest)
        -> Result<DecryptedValues, FhevmError>;
}

/// An FHE backend resolved from configuration.
pub enum FhevmProvider {
    Mock(MockFhevm),
    Relayer(RelayerFhevm),
}

impl FhevmProvider {
    /// Resolve the backend for a configuration.
    ///
    /// The mock is substituted only for the designated local chain ID; a
    /// production chain without a relayer URL is a hard configuration error,
    /// never a silent fall back to mock behavior.
    pub fn create(config: FhevmConfig) -> Result<Self, FhevmError> {
        if config.chain_id == MOCK_CHAIN_ID {
            tracing::info!(chain_id = config.chain_id, "using mock FHE backend");
            return Ok(Self::Mock(MockFhevm::new(config.chain_id)));
        }

        match config.relayer_url.clone() {
            Some(url) => Ok(Self::Relayer(RelayerFhevm::new(config, url)?)),
            None => Err(FhevmError::UnsupportedChain(config.chain_id)),
        }
    }
}

impl Fhevm for FhevmProvider {
    fn capabilities(&self) -> FhevmCapabilities {
        match self {
            Self::Mock(inner) => inner.capabilities(),
            Self::Relayer(inner) => inner.capabilities(),
        }
    }

    async fn generate_keypair(&self) -> Result<DecryptionKeypair, FhevmError> {
        match self {
            Self::Mock(inner) => inner.generate_keypair().await,
            Self::Relayer(inner) => inner.generate_keypair().await,
        }
    }

    async fn encrypt_input(&self, input: EncryptedInput) -> Result<CiphertextHandles, FhevmError> {
        match self {
            Self::Mock(inner) => inner.encrypt_input(input).await,
            Self::Relayer(inner) => inner.encrypt_input(input).await,
        }
    }

    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<DecryptedValues, FhevmError> {
        match self {
            Self::Mock(inner) => inner.user_decrypt(request).await,
            Self::Relayer(inner) => inner.user_decrypt(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chain_id: u64, relayer_url: Option<&str>) -> FhevmConfig {
        FhevmConfig {
            rpc_url: "http://localhost:8545".into(),
            chain_id,
            acl_address: Address::ZERO,
            input_verifier_address: Address::ZERO,
            kms_verifier_address: Address::ZERO,
            relayer_url: relayer_url.map(String::from),
        }
    }

    #[test]
    fn local_chain_resolves_to_mock() {
        let provider = FhevmProvider::create(config(MOCK_CHAIN_ID, None)).unwrap();
        assert!(provider.capabilities().mock);
        assert!(provider.capabilities().strip_signature_prefix);
    }

    #[test]
    fn production_chain_without_relayer_is_an_error_not_a_mock() {
        let result = FhevmProvider::create(config(11155111, None));
        assert!(matches!(result, Err(FhevmError::UnsupportedChain(11155111))));
    }

    #[test]
    fn production_chain_with_relayer_resolves_to_relayer() {
        let provider =
            FhevmProvider::create(config(11155111, Some("https://relayer.example"))).unwrap();
        assert!(!provider.capabilities().mock);
        assert!(!provider.capabilities().strip_signature_prefix);
    }

    #[test]
    fn decrypted_values_lookup_is_explicit_absent() {
        let mut values = DecryptedValues::default();
        values.insert(B256::repeat_byte(0x01), 75);
        assert_eq!(values.value(B256::repeat_byte(0x01)), Some(75));
        // An unknown handle is absent, not a decrypted zero.
        assert_eq!(values.value(B256::repeat_byte(0x02)), None);
    }

    #[test]
    fn input_builder_accumulates_values() {
        let input = EncryptedInput::bind(Address::ZERO, Address::ZERO)
            .add32(75)
            .add32(30);
        assert_eq!(input.values, vec![75, 30]);
    }
}
