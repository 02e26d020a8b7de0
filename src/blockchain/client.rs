// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! JSON-RPC clients for the diary contract.
//!
//! [`DiaryReader`] wraps a plain HTTP provider for view calls and liveness
//! probes; [`DiaryWriter`] adds a wallet filler for `addEntry` submissions.
//! Both are recreated, never mutated in place, when the wallet or network
//! changes.

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    signers::local::PrivateKeySigner,
};

use super::contract::IEncryptedDiary;
use super::types::{DayIndex, EntryField, EntryRecord, ZERO_HANDLE};

/// HTTP provider type for view calls (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// HTTP provider type with signing capabilities.
type WalletProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// Errors that can occur during chain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("No contract code at {address}")]
    NoCode { address: String },

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("{field} handle is the zero sentinel")]
    InvalidHandle { field: EntryField },
}

/// Classify a contract-call failure: transport problems are connectivity,
/// everything else stays a contract error.
fn map_call_error(err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(e) => ChainError::Rpc(e.to_string()),
        other => ChainError::Contract(other.to_string()),
    }
}

/// Read-only client for the diary contract.
pub struct DiaryReader {
    provider: HttpProvider,
    contract_address: Address,
}

impl DiaryReader {
    /// Connect a read-only client to an RPC endpoint.
    pub fn new(rpc_url: &str, contract_address: Address) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider,
            contract_address,
        })
    }

    /// Current block number. Used as the liveness probe: if this fails the
    /// endpoint itself is down, which callers must report differently from
    /// a missing contract.
    pub async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    /// Accounts the node manages. Only meaningful against a development
    /// node; public endpoints return an empty list.
    pub async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.provider
            .get_accounts()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    /// Whether bytecode exists at the configured contract address.
    ///
    /// Fails closed: an RPC failure propagates as an error rather than a
    /// spurious `false`.
    pub async fn code_exists(&self) -> Result<bool, ChainError> {
        let code = self
            .provider
            .get_code_at(self.contract_address)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(!code.is_empty())
    }

    /// Number of entries the user has recorded.
    pub async fn entry_count(&self, user: Address) -> Result<u64, ChainError> {
        let contract = IEncryptedDiary::new(self.contract_address, self.provider.clone());
        let count = contract
            .getEntryCount(user)
            .call()
            .await
            .map_err(map_call_error)?;
        Ok(count.to::<u64>())
    }

    /// Whether an entry exists for (user, date).
    pub async fn entry_exists(&self, user: Address, date: DayIndex) -> Result<bool, ChainError> {
        let contract = IEncryptedDiary::new(self.contract_address, self.provider.clone());
        contract
            .entryExists(user, U256::from(date))
            .call()
            .await
            .map_err(map_call_error)
    }

    /// Day index of the user's most recent entry (0 when none).
    pub async fn last_entry_date(&self, user: Address) -> Result<DayIndex, ChainError> {
        let contract = IEncryptedDiary::new(self.contract_address, self.provider.clone());
        let date = contract
            .getLastEntryDate(user)
            .call()
            .await
            .map_err(map_call_error)?;
        Ok(date.to::<u64>())
    }

    /// Fetch the stored entry for (user, date), rejecting the zero-handle
    /// sentinel as "no data" and naming the offending field.
    pub async fn entry(&self, user: Address, date: DayIndex) -> Result<EntryRecord, ChainError> {
        let contract = IEncryptedDiary::new(self.contract_address, self.provider.clone());
        let ret = contract
            .getEntry(user, U256::from(date))
            .call()
            .await
            .map_err(map_call_error)?;

        let record = EntryRecord {
            mental_state_handle: ret.mentalStateHandle,
            stress_handle: ret.stressHandle,
            timestamp: ret.timestamp.to::<u64>(),
        };
        record
            .validate_handles()
            .map_err(|field| ChainError::InvalidHandle { field })?;
        Ok(record)
    }

    /// Contract address this client is bound to.
    pub fn contract_address(&self) -> Address {
        self.contract_address
    }
}

/// Client with signing capabilities for `addEntry` submissions.
pub struct DiaryWriter {
    provider: WalletProvider,
    contract_address: Address,
    sender: Address,
}

impl DiaryWriter {
    /// Connect a signing client to an RPC endpoint.
    pub fn new(
        rpc_url: &str,
        contract_address: Address,
        signer: PrivateKeySigner,
    ) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let sender = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        Ok(Self {
            provider,
            contract_address,
            sender,
        })
    }

    /// Address transactions are sent from.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Submit `addEntry(date, mentalHandle, stressHandle)` with the supplied
    /// gas ceiling and wait for one confirmation.
    ///
    /// Both handles must already have passed zero-sentinel validation.
    /// Reverts surface the chain's revert reason.
    pub async fn add_entry(
        &self,
        date: DayIndex,
        mental_handle: B256,
        stress_handle: B256,
        gas_limit: u64,
    ) -> Result<AddEntryReceipt, ChainError> {
        debug_assert_ne!(mental_handle, ZERO_HANDLE);
        debug_assert_ne!(stress_handle, ZERO_HANDLE);

        let contract = IEncryptedDiary::new(self.contract_address, self.provider.clone());

        let pending = contract
            .addEntry(U256::from(date), mental_handle, stress_handle)
            .gas(gas_limit)
            .send()
            .await
            .map_err(|e| match e {
                alloy::contract::Error::TransportError(t) => ChainError::Rpc(t.to_string()),
                other => ChainError::Reverted(other.to_string()),
            })?;

        let tx_hash = *pending.tx_hash();

        // get_receipt waits for one confirmation.
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(format!("waiting for confirmation: {e}")))?;

        if !receipt.status() {
            return Err(ChainError::Reverted(format!(
                "addEntry reverted in block {} (tx {tx_hash})",
                receipt.block_number.unwrap_or(0),
            )));
        }

        tracing::debug!(
            %tx_hash,
            block = receipt.block_number.unwrap_or(0),
            gas_used = receipt.gas_used,
            "addEntry confirmed"
        );

        Ok(AddEntryReceipt {
            tx_hash: format!("{tx_hash:?}"),
            block_number: receipt.block_number.unwrap_or(0),
            gas_used: receipt.gas_used,
        })
    }
}

/// Confirmed `addEntry` submission.
#[derive(Debug, Clone)]
pub struct AddEntryReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
}
