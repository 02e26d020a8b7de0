// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Blockchain types and network constants.

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Network configuration for an FHEVM-enabled chain.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Default RPC endpoint URL
    pub rpc_url: &'static str,
    /// Diary contract address on this network, if deployed
    pub contract_address: Option<&'static str>,
}

/// Local Hardhat development chain (mock FHE backend).
pub const LOCAL_HARDHAT: NetworkConfig = NetworkConfig {
    name: "Hardhat (local)",
    chain_id: 31337,
    rpc_url: "http://localhost:8545",
    contract_address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
};

/// Sepolia public testnet (real FHE relayer).
pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Sepolia",
    chain_id: 11155111,
    rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    contract_address: Some("0xF6ef3a0D13D0F71cA66e28Ca84e9f23f119B4007"),
};

/// Look up the network configuration for a chain ID.
pub fn network_for(chain_id: u64) -> Option<&'static NetworkConfig> {
    match chain_id {
        31337 => Some(&LOCAL_HARDHAT),
        11155111 => Some(&SEPOLIA),
        _ => None,
    }
}

/// Resolve the diary contract address for a chain ID, honoring the
/// `HEALLOCK_CONTRACT_ADDRESS` environment override.
pub fn contract_address_for(chain_id: u64) -> Option<String> {
    if let Ok(addr) = std::env::var(crate::config::CONTRACT_ADDRESS_ENV) {
        if !addr.trim().is_empty() {
            return Some(addr.trim().to_string());
        }
    }
    network_for(chain_id)
        .and_then(|n| n.contract_address)
        .map(str::to_string)
}

/// The all-zero 32-byte handle, the contract's "no ciphertext here" sentinel.
///
/// A zero handle is never a valid ciphertext reference and must be treated
/// as absent data rather than a decryptable zero.
pub const ZERO_HANDLE: B256 = B256::ZERO;

/// Which encrypted field of an entry a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryField {
    MentalState,
    Stress,
}

impl std::fmt::Display for EntryField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryField::MentalState => write!(f, "mental state"),
            EntryField::Stress => write!(f, "stress"),
        }
    }
}

/// One diary entry as stored on-chain: two opaque ciphertext handles and the
/// write timestamp set by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub mental_state_handle: B256,
    pub stress_handle: B256,
    pub timestamp: u64,
}

impl EntryRecord {
    /// Check both handles against the zero sentinel, naming the first
    /// invalid field.
    pub fn validate_handles(&self) -> Result<(), EntryField> {
        if self.mental_state_handle == ZERO_HANDLE {
            return Err(EntryField::MentalState);
        }
        if self.stress_handle == ZERO_HANDLE {
            return Err(EntryField::Stress);
        }
        Ok(())
    }
}

/// Day index (days since the Unix epoch), the per-user entry key.
pub type DayIndex = u64;

/// Today's day index in UTC.
pub fn today() -> DayIndex {
    (chrono::Utc::now().timestamp() / 86_400) as DayIndex
}

/// A decrypted diary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedEntry {
    pub mental_state: u32,
    pub stress: u32,
}

/// Parse a 0x-prefixed contract or wallet address.
pub fn parse_address(value: &str) -> Result<Address, super::ChainError> {
    value
        .parse::<Address>()
        .map_err(|e| super::ChainError::InvalidAddress(format!("{value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_lookup_matches_supported_chains() {
        assert_eq!(network_for(31337).unwrap().name, "Hardhat (local)");
        assert_eq!(network_for(11155111).unwrap().name, "Sepolia");
        assert!(network_for(1).is_none());
    }

    #[test]
    fn zero_handle_is_flagged_with_field() {
        let record = EntryRecord {
            mental_state_handle: B256::repeat_byte(0xaa),
            stress_handle: ZERO_HANDLE,
            timestamp: 1_700_000_000,
        };
        assert_eq!(record.validate_handles(), Err(EntryField::Stress));

        let record = EntryRecord {
            mental_state_handle: ZERO_HANDLE,
            stress_handle: ZERO_HANDLE,
            timestamp: 0,
        };
        assert_eq!(record.validate_handles(), Err(EntryField::MentalState));
    }

    #[test]
    fn valid_handles_pass() {
        let record = EntryRecord {
            mental_state_handle: B256::repeat_byte(0x01),
            stress_handle: B256::repeat_byte(0x02),
            timestamp: 1,
        };
        assert!(record.validate_handles().is_ok());
    }

    #[test]
    fn entry_field_display_is_user_facing() {
        assert_eq!(EntryField::MentalState.to_string(), "mental state");
        assert_eq!(EntryField::Stress.to_string(), "stress");
    }
}
