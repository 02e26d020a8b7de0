// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Deterministic mock FHE backend for local development.
//!
//! Same interface as the production relayer, no cryptographic privacy:
//! plaintexts live in memory keyed by handle. The mock still enforces the
//! authorization protocol (signature recovery against the EIP-712 digest,
//! the validity window, and a per-(handle, contract, user) grant table) so
//! orchestration bugs surface locally instead of on testnet. Grants are
//! dropped when the process restarts, which is why stale handles decrypt as
//! "not authorized" until the entry is re-added.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, Address, B256};

use super::auth::DecryptAuthorization;
use super::keypair::DecryptionKeypair;
use super::{
    CiphertextHandles, DecryptedValues, EncryptedInput, Fhevm, FhevmCapabilities, FhevmError,
    UserDecryptRequest,
};

#[derive(Default)]
struct MockState {
    /// Monotonic counter salted into handle derivation so equal plaintexts
    /// never collide.
    counter: u64,
    /// Handle -> plaintext.
    plaintexts: HashMap<B256, u64>,
    /// (handle, contract, user) grants minted at encryption time.
    grants: HashSet<(B256, Address, Address)>,
}

/// In-memory mock of the FHE backend.
#[derive(Clone)]
pub struct MockFhevm {
    chain_id: u64,
    state: Arc<Mutex<MockState>>,
}

impl MockFhevm {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Drop every decryption grant while keeping ciphertexts, simulating the
    /// permission loss a backend restart causes for stale handles.
    pub fn clear_grants(&self) {
        self.state.lock().expect("mock state poisoned").grants.clear();
    }

    fn derive_handle(contract: Address, user: Address, value: u32, counter: u64) -> B256 {
        let mut preimage = Vec::with_capacity(20 + 20 + 4 + 8);
        preimage.extend_from_slice(contract.as_slice());
        preimage.extend_from_slice(user.as_slice());
        preimage.extend_from_slice(&value.to_be_bytes());
        preimage.extend_from_slice(&counter.to_be_bytes());
        keccak256(&preimage)
    }
}

impl Fhevm for MockFhevm {
    fn capabilities(&self) -> FhevmCapabilities {
        FhevmCapabilities::MOCK
    }

    async fn generate_keypair(&self) -> Result<DecryptionKeypair, FhevmError> {
        DecryptionKeypair::generate()
    }

    async fn encrypt_input(&self, input: EncryptedInput) -> Result<CiphertextHandles, FhevmError> {
        if input.values.is_empty() {
            return Err(FhevmError::Encryption("input batch is empty".into()));
        }

        let mut state = self.state.lock().expect("mock state poisoned");
        let mut handles = Vec::with_capacity(input.values.len());
        for value in &input.values {
            state.counter += 1;
            let handle = Self::derive_handle(input.contract, input.user, *value, state.counter);
            state.plaintexts.insert(handle, u64::from(*value));
            state.grants.insert((handle, input.contract, input.user));
            handles.push(handle);
        }

        // The proof is opaque to callers; a digest of the handles suffices.
        let mut proof_preimage = Vec::with_capacity(handles.len() * 32);
        for handle in &handles {
            proof_preimage.extend_from_slice(handle.as_slice());
        }
        let input_proof = keccak256(&proof_preimage).to_vec();

        tracing::debug!(
            contract = %input.contract,
            user = %input.user,
            count = handles.len(),
            "mock encrypted input batch"
        );

        Ok(CiphertextHandles {
            handles,
            input_proof,
        })
    }

    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<DecryptedValues, FhevmError> {
        // The mock verifies the bare hex form; a leading 0x means the caller
        // skipped the capability-driven adjustment.
        if request.signature.starts_with("0x") {
            return Err(FhevmError::Signature(
                "mock backend expects the signature hex without its 0x prefix".into(),
            ));
        }

        let authorization = DecryptAuthorization {
            public_key: request.public_key,
            contract_addresses: request.contract_addresses.clone(),
            chain_id: self.chain_id,
            start_timestamp: request.start_timestamp,
            duration_days: request.duration_days,
        };

        let signer = authorization.recover(&request.signature)?;
        if signer != request.user {
            return Err(FhevmError::NotAuthorized(format!(
                "authorization signed by {signer}, not by {}",
                request.user
            )));
        }

        let now = chrono::Utc::now().timestamp() as u64;
        if !authorization.is_valid_at(now) {
            return Err(FhevmError::NotAuthorized(
                "authorization validity window does not cover the current time".into(),
            ));
        }

        let state = self.state.lock().expect("mock state poisoned");
        let mut values = DecryptedValues::default();
        for pair in &request.handle_pairs {
            if !request.contract_addresses.contains(&pair.contract) {
                return Err(FhevmError::NotAuthorized(format!(
                    "contract {} is outside the signed authorization",
                    pair.contract
                )));
            }
            if !state.grants.contains(&(pair.handle, pair.contract, request.user)) {
                return Err(FhevmError::NotAuthorized(format!(
                    "no decryption grant for handle {} and user {}",
                    pair.handle, request.user
                )));
            }
            let plaintext = state.plaintexts.get(&pair.handle).ok_or_else(|| {
                FhevmError::NotAuthorized(format!("handle {} unknown to backend", pair.handle))
            })?;
            values.insert(pair.handle, *plaintext);
        }

        Ok(values)
    }
}
