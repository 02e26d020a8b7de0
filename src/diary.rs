// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Diary orchestrator.
//!
//! Coordinates the chain client and the FHE backend to implement the three
//! user-facing operations: [`DiaryOrchestrator::add_entry`],
//! [`DiaryOrchestrator::decrypt_entry`], and
//! [`DiaryOrchestrator::load_entry_count`]. Each call is one pass through a
//! fixed sequence; there is no long-lived operation state. Inputs are
//! validated before any network call, and lower-layer errors are re-raised
//! through the [`DiaryError`] taxonomy with user-facing hints attached.

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::{
    contract_address_for, today, AddEntryReceipt, ChainError, DayIndex, DecryptedEntry,
    DiaryReader, DiaryWriter, EntryField, EntryRecord,
};
use crate::config::{ADD_ENTRY_GAS_LIMIT, MAX_SCORE, PERMISSION_PROPAGATION_DELAY};
use crate::error::DiaryError;
use crate::fhe::{
    adjust_signature, DecryptAuthorization, EncryptedInput, Fhevm, FhevmCapabilities,
    HandleContractPair, UserDecryptRequest,
};

/// Chain operations the orchestrator needs, abstracted for testability.
///
/// [`LiveChain`] is the production implementation over JSON-RPC.
#[allow(async_fn_in_trait)]
pub trait DiaryChain {
    /// Liveness probe; fails when the RPC endpoint itself is down.
    async fn liveness(&self) -> Result<u64, ChainError>;
    async fn code_exists(&self) -> Result<bool, ChainError>;
    async fn entry_count(&self, user: Address) -> Result<u64, ChainError>;
    async fn entry_exists(&self, user: Address, date: DayIndex) -> Result<bool, ChainError>;
    async fn entry(&self, user: Address, date: DayIndex) -> Result<EntryRecord, ChainError>;
    async fn last_entry_date(&self, user: Address) -> Result<DayIndex, ChainError>;
    async fn add_entry(
        &self,
        date: DayIndex,
        mental_handle: B256,
        stress_handle: B256,
        gas_limit: u64,
    ) -> Result<AddEntryReceipt, ChainError>;
}

/// Production chain access: a read client plus a signing client, bound to
/// the same contract. Recreated whenever the wallet or network changes.
pub struct LiveChain {
    pub reader: DiaryReader,
    pub writer: DiaryWriter,
}

impl DiaryChain for LiveChain {
    async fn liveness(&self) -> Result<u64, ChainError> {
        self.reader.block_number().await
    }

    async fn code_exists(&self) -> Result<bool, ChainError> {
        self.reader.code_exists().await
    }

    async fn entry_count(&self, user: Address) -> Result<u64, ChainError> {
        self.reader.entry_count(user).await
    }

    async fn entry_exists(&self, user: Address, date: DayIndex) -> Result<bool, ChainError> {
        self.reader.entry_exists(user, date).await
    }

    async fn entry(&self, user: Address, date: DayIndex) -> Result<EntryRecord, ChainError> {
        self.reader.entry(user, date).await
    }

    async fn last_entry_date(&self, user: Address) -> Result<DayIndex, ChainError> {
        self.reader.last_entry_date(user).await
    }

    async fn add_entry(
        &self,
        date: DayIndex,
        mental_handle: B256,
        stress_handle: B256,
        gas_limit: u64,
    ) -> Result<AddEntryReceipt, ChainError> {
        self.writer
            .add_entry(date, mental_handle, stress_handle, gas_limit)
            .await
    }
}

/// Outcome of a decryption attempt that is not a hard failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// Entry decrypted successfully.
    Decrypted(TimestampedEntry),
    /// No entry recorded for that date. Not an error.
    NotFound,
    /// An entry exists but the named field's handle is the zero sentinel.
    InvalidHandle(EntryField),
}

/// A decrypted entry together with its on-chain write timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedEntry {
    pub entry: DecryptedEntry,
    pub timestamp: u64,
}

/// Resolve the diary contract address for a chain, or fail with the
/// configuration remedy.
pub fn resolve_contract_address(chain_id: u64) -> Result<Address, DiaryError> {
    let raw = contract_address_for(chain_id).ok_or_else(|| {
        DiaryError::ConfigurationMissing(format!(
            "no diary contract configured for chain {chain_id}; set {}",
            crate::config::CONTRACT_ADDRESS_ENV
        ))
    })?;
    raw.parse::<Address>().map_err(|e| {
        DiaryError::ConfigurationMissing(format!("contract address {raw} is invalid: {e}"))
    })
}

/// One-pass coordinator for diary operations.
pub struct DiaryOrchestrator<C, F> {
    chain: C,
    fhevm: F,
    signer: PrivateKeySigner,
    user: Address,
    contract_address: Address,
    chain_id: u64,
    capabilities: FhevmCapabilities,
    permission_delay: std::time::Duration,
}

impl<C: DiaryChain, F: Fhevm> DiaryOrchestrator<C, F> {
    /// Assemble an orchestrator. Preconditions the original checked per call
    /// (contract configured, signer present, FHE backend ready) are
    /// established here once; a constructed orchestrator has them all.
    pub fn new(
        chain: C,
        fhevm: F,
        signer: PrivateKeySigner,
        contract_address: Address,
        chain_id: u64,
    ) -> Self {
        let capabilities = fhevm.capabilities();
        let user = signer.address();
        Self {
            chain,
            fhevm,
            signer,
            user,
            contract_address,
            chain_id,
            capabilities,
            permission_delay: PERMISSION_PROPAGATION_DELAY,
        }
    }

    /// Override the post-confirmation wait (tests set it to zero).
    pub fn with_permission_delay(mut self, delay: std::time::Duration) -> Self {
        self.permission_delay = delay;
        self
    }

    /// Wallet address entries are recorded under.
    pub fn user(&self) -> Address {
        self.user
    }

    /// Encrypt both scores, submit `addEntry`, and wait out permission
    /// propagation. Validation happens before any network call; the chain's
    /// atomicity guarantees no partial state on a revert.
    pub async fn add_entry(
        &self,
        date: DayIndex,
        mental_score: u32,
        stress_score: u32,
    ) -> Result<AddEntryReceipt, DiaryError> {
        if mental_score > MAX_SCORE {
            return Err(DiaryError::Validation(format!(
                "mental state score {mental_score} is outside 0..={MAX_SCORE}"
            )));
        }
        if stress_score > MAX_SCORE {
            return Err(DiaryError::Validation(format!(
                "stress level {stress_score} is outside 0..={MAX_SCORE}"
            )));
        }
        if date > today() {
            return Err(DiaryError::Validation(format!(
                "date {date} is in the future"
            )));
        }

        tracing::debug!(date, "encrypting diary scores");
        let mental_handle = self.encrypt_score(mental_score).await?;
        let stress_handle = self.encrypt_score(stress_score).await?;

        tracing::debug!(date, "submitting addEntry");
        let receipt = self
            .chain
            .add_entry(date, mental_handle, stress_handle, ADD_ENTRY_GAS_LIMIT)
            .await?;

        // The FHE backend grants decryption permissions for the new handles
        // asynchronously; give it time before reporting completion.
        tokio::time::sleep(self.permission_delay).await;

        tracing::info!(date, tx = %receipt.tx_hash, "diary entry added");
        Ok(receipt)
    }

    async fn encrypt_score(&self, score: u32) -> Result<B256, DiaryError> {
        let input = EncryptedInput::bind(self.contract_address, self.user).add32(score);
        let encrypted = self.fhevm.encrypt_input(input).await?;
        encrypted
            .handles
            .first()
            .copied()
            .ok_or_else(|| DiaryError::EncryptionFailed("backend returned no handle".into()))
    }

    /// Fetch and decrypt the entry for a date.
    ///
    /// A missing entry and a zero-sentinel handle are outcomes, not errors;
    /// an ungranted decryption surfaces as
    /// [`DiaryError::AuthorizationDenied`] with its remediation.
    pub async fn decrypt_entry(&self, date: DayIndex) -> Result<DecryptOutcome, DiaryError> {
        if !self.chain.entry_exists(self.user, date).await? {
            return Ok(DecryptOutcome::NotFound);
        }

        let record = match self.chain.entry(self.user, date).await {
            Ok(record) => record,
            Err(ChainError::InvalidHandle { field }) => {
                tracing::warn!(date, %field, "stored handle is the zero sentinel");
                return Ok(DecryptOutcome::InvalidHandle(field));
            }
            Err(other) => return Err(other.into()),
        };

        let keypair = self.fhevm.generate_keypair().await?;
        let authorization = DecryptAuthorization::new(
            keypair.public_key,
            vec![self.contract_address],
            self.chain_id,
        )?;

        let signature = authorization.sign(&self.signer).await?;
        let signature = adjust_signature(signature, &self.capabilities);

        let request = UserDecryptRequest {
            handle_pairs: vec![
                HandleContractPair {
                    handle: record.mental_state_handle,
                    contract: self.contract_address,
                },
                HandleContractPair {
                    handle: record.stress_handle,
                    contract: self.contract_address,
                },
            ],
            private_key: keypair.private_key,
            public_key: keypair.public_key,
            signature,
            contract_addresses: vec![self.contract_address],
            user: self.user,
            start_timestamp: authorization.start_timestamp,
            duration_days: authorization.duration_days,
        };

        let values = self.fhevm.user_decrypt(request).await?;

        let mental_state = self.revealed(&values, record.mental_state_handle, EntryField::MentalState)?;
        let stress = self.revealed(&values, record.stress_handle, EntryField::Stress)?;

        Ok(DecryptOutcome::Decrypted(TimestampedEntry {
            entry: DecryptedEntry {
                mental_state,
                stress,
            },
            timestamp: record.timestamp,
        }))
    }

    /// Extract one revealed plaintext. A handle absent from the result map
    /// is an error, never a defaulted zero.
    fn revealed(
        &self,
        values: &crate::fhe::DecryptedValues,
        handle: B256,
        field: EntryField,
    ) -> Result<u32, DiaryError> {
        let raw = values.value(handle).ok_or_else(|| {
            DiaryError::Unknown(format!(
                "backend result omits the {field} handle; value unavailable"
            ))
        })?;
        u32::try_from(raw)
            .map_err(|_| DiaryError::Unknown(format!("{field} plaintext {raw} exceeds u32")))
    }

    /// Number of recorded entries, with connectivity triage: RPC down,
    /// contract missing, and zero entries are three distinct answers.
    pub async fn load_entry_count(&self) -> Result<u64, DiaryError> {
        if let Err(e) = self.chain.liveness().await {
            return Err(DiaryError::ConnectivityFailure(format!(
                "RPC endpoint not responding ({e}); on a local setup ensure the node is running"
            )));
        }

        if !self.chain.code_exists().await? {
            return Err(DiaryError::ContractNotDeployed {
                address: format!("{}", self.contract_address),
            });
        }

        Ok(self.chain.entry_count(self.user).await?)
    }

    /// Day index of the most recent entry, if any.
    pub async fn last_entry_date(&self) -> Result<Option<DayIndex>, DiaryError> {
        let date = self.chain.last_entry_date(self.user).await?;
        Ok((date > 0).then_some(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::ZERO_HANDLE;
    use crate::fhe::MockFhevm;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const CHAIN_ID: u64 = 31337;

    #[derive(Default)]
    struct FakeChain {
        entries: Mutex<HashMap<DayIndex, EntryRecord>>,
        chain_calls: AtomicUsize,
        down: bool,
        no_code: bool,
    }

    impl FakeChain {
        fn insert(&self, date: DayIndex, record: EntryRecord) {
            self.entries.lock().unwrap().insert(date, record);
        }

        fn calls(&self) -> usize {
            self.chain_calls.load(Ordering::SeqCst)
        }

        fn check_up(&self) -> Result<(), ChainError> {
            if self.down {
                Err(ChainError::Rpc("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    impl DiaryChain for &FakeChain {
        async fn liveness(&self) -> Result<u64, ChainError> {
            self.check_up()?;
            Ok(1)
        }

        async fn code_exists(&self) -> Result<bool, ChainError> {
            self.check_up()?;
            Ok(!self.no_code)
        }

        async fn entry_count(&self, _user: Address) -> Result<u64, ChainError> {
            self.check_up()?;
            self.chain_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.lock().unwrap().len() as u64)
        }

        async fn entry_exists(&self, _user: Address, date: DayIndex) -> Result<bool, ChainError> {
            self.check_up()?;
            self.chain_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.lock().unwrap().contains_key(&date))
        }

        async fn entry(&self, _user: Address, date: DayIndex) -> Result<EntryRecord, ChainError> {
            self.check_up()?;
            self.chain_calls.fetch_add(1, Ordering::SeqCst);
            let record = self
                .entries
                .lock()
                .unwrap()
                .get(&date)
                .cloned()
                .expect("entry checked via entry_exists first");
            record
                .validate_handles()
                .map_err(|field| ChainError::InvalidHandle { field })?;
            Ok(record)
        }

        async fn last_entry_date(&self, _user: Address) -> Result<DayIndex, ChainError> {
            self.check_up()?;
            Ok(self
                .entries
                .lock()
                .unwrap()
                .keys()
                .copied()
                .max()
                .unwrap_or(0))
        }

        async fn add_entry(
            &self,
            date: DayIndex,
            mental_handle: B256,
            stress_handle: B256,
            _gas_limit: u64,
        ) -> Result<AddEntryReceipt, ChainError> {
            self.check_up()?;
            self.chain_calls.fetch_add(1, Ordering::SeqCst);
            self.insert(
                date,
                EntryRecord {
                    mental_state_handle: mental_handle,
                    stress_handle,
                    timestamp: 1_700_000_000,
                },
            );
            Ok(AddEntryReceipt {
                tx_hash: "0xfake".into(),
                block_number: 1,
                gas_used: 100_000,
            })
        }
    }

    fn orchestrator<'a>(
        chain: &'a FakeChain,
        fhevm: MockFhevm,
    ) -> DiaryOrchestrator<&'a FakeChain, MockFhevm> {
        let signer = PrivateKeySigner::from_slice(&[0x42; 32]).unwrap();
        DiaryOrchestrator::new(
            chain,
            fhevm,
            signer,
            Address::repeat_byte(0x5f),
            CHAIN_ID,
        )
        .with_permission_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn add_then_decrypt_round_trips() {
        let chain = FakeChain::default();
        let fhevm = MockFhevm::new(CHAIN_ID);
        let diary = orchestrator(&chain, fhevm);

        diary.add_entry(20418, 75, 30).await.unwrap();

        match diary.decrypt_entry(20418).await.unwrap() {
            DecryptOutcome::Decrypted(found) => {
                assert_eq!(found.entry.mental_state, 75);
                assert_eq!(found.entry.stress, 30);
                assert_eq!(found.timestamp, 1_700_000_000);
            }
            other => panic!("expected decrypted entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn out_of_range_scores_are_rejected_before_any_chain_call() {
        let chain = FakeChain::default();
        let diary = orchestrator(&chain, MockFhevm::new(CHAIN_ID));

        let err = diary.add_entry(20418, 101, 30).await.unwrap_err();
        assert!(matches!(err, DiaryError::Validation(_)));
        assert!(err.to_string().contains("mental state"));

        let err = diary.add_entry(20418, 75, 200).await.unwrap_err();
        assert!(err.to_string().contains("stress level"));

        assert_eq!(chain.calls(), 0);
    }

    #[tokio::test]
    async fn future_dates_are_rejected_before_any_chain_call() {
        let chain = FakeChain::default();
        let diary = orchestrator(&chain, MockFhevm::new(CHAIN_ID));

        let err = diary.add_entry(today() + 1, 50, 50).await.unwrap_err();
        assert!(matches!(err, DiaryError::Validation(_)));
        assert!(err.to_string().contains("future"));
        assert_eq!(chain.calls(), 0);
    }

    #[tokio::test]
    async fn decrypting_a_missing_date_is_not_found_not_zero() {
        let chain = FakeChain::default();
        let diary = orchestrator(&chain, MockFhevm::new(CHAIN_ID));

        let outcome = diary.decrypt_entry(20418).await.unwrap();
        assert_eq!(outcome, DecryptOutcome::NotFound);
    }

    #[tokio::test]
    async fn zero_sentinel_handle_names_the_field() {
        let chain = FakeChain::default();
        chain.insert(
            20418,
            EntryRecord {
                mental_state_handle: B256::repeat_byte(0x01),
                stress_handle: ZERO_HANDLE,
                timestamp: 1,
            },
        );
        let diary = orchestrator(&chain, MockFhevm::new(CHAIN_ID));

        let outcome = diary.decrypt_entry(20418).await.unwrap();
        assert_eq!(outcome, DecryptOutcome::InvalidHandle(EntryField::Stress));
    }

    #[tokio::test]
    async fn lost_grants_surface_authorization_denied_with_remediation() {
        let chain = FakeChain::default();
        let fhevm = MockFhevm::new(CHAIN_ID);
        let diary = orchestrator(&chain, fhevm.clone());

        diary.add_entry(20418, 60, 40).await.unwrap();
        fhevm.clear_grants();

        let err = diary.decrypt_entry(20418).await.unwrap_err();
        match err {
            DiaryError::AuthorizationDenied { remediation, .. } => {
                assert!(remediation.to_lowercase().contains("re-add"));
            }
            other => panic!("expected AuthorizationDenied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn entry_count_triage_distinguishes_down_missing_and_zero() {
        let down = FakeChain {
            down: true,
            ..Default::default()
        };
        let diary = orchestrator(&down, MockFhevm::new(CHAIN_ID));
        assert!(matches!(
            diary.load_entry_count().await.unwrap_err(),
            DiaryError::ConnectivityFailure(_)
        ));

        let bare = FakeChain {
            no_code: true,
            ..Default::default()
        };
        let diary = orchestrator(&bare, MockFhevm::new(CHAIN_ID));
        assert!(matches!(
            diary.load_entry_count().await.unwrap_err(),
            DiaryError::ContractNotDeployed { .. }
        ));

        let empty = FakeChain::default();
        let diary = orchestrator(&empty, MockFhevm::new(CHAIN_ID));
        assert_eq!(diary.load_entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn entry_count_reflects_recorded_entries() {
        let chain = FakeChain::default();
        let diary = orchestrator(&chain, MockFhevm::new(CHAIN_ID));

        diary.add_entry(20417, 55, 45).await.unwrap();
        diary.add_entry(20418, 75, 30).await.unwrap();
        assert_eq!(diary.load_entry_count().await.unwrap(), 2);
        assert_eq!(diary.last_entry_date().await.unwrap(), Some(20418));
    }

    #[test]
    fn unknown_chain_has_no_contract_address() {
        let err = resolve_contract_address(1).unwrap_err();
        assert!(matches!(err, DiaryError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("HEALLOCK_CONTRACT_ADDRESS"));
    }

    #[test]
    fn local_chain_resolves_the_default_address() {
        let address = resolve_contract_address(31337).unwrap();
        assert_ne!(address, Address::ZERO);
    }

    #[tokio::test]
    async fn last_entry_date_is_none_when_empty() {
        let chain = FakeChain::default();
        let diary = orchestrator(&chain, MockFhevm::new(CHAIN_ID));
        assert_eq!(diary.last_entry_date().await.unwrap(), None);
    }
}
