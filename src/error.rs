// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Central failure taxonomy for diary operations.
//!
//! Lower layers carry their own error enums ([`crate::blockchain::ChainError`],
//! [`crate::fhe::FhevmError`]); the orchestrator maps them into this taxonomy
//! at its boundary, attaching a human-readable hint. Every variant renders a
//! distinct user-facing message and none is ever swallowed silently.

use crate::blockchain::{ChainError, EntryField};
use crate::fhe::FhevmError;

/// A diary operation failure, categorized for user-facing reporting.
#[derive(Debug, thiserror::Error)]
pub enum DiaryError {
    /// Required configuration is absent (contract address, signer, relayer).
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The RPC endpoint itself is unreachable. Distinguished from
    /// [`DiaryError::ContractNotDeployed`] by probing liveness before
    /// bytecode presence.
    #[error("RPC endpoint unreachable: {0}")]
    ConnectivityFailure(String),

    /// The RPC endpoint answers but no bytecode lives at the configured
    /// contract address.
    #[error("no contract deployed at {address} (deploy the diary contract first)")]
    ContractNotDeployed { address: String },

    /// Input rejected before any network call was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The FHE backend failed to produce a ciphertext for a valid input.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// The chain rejected or reverted the submitted transaction.
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    /// The FHE backend refused the decryption authorization. Recoverable in
    /// development: re-adding the entry mints fresh handles with fresh
    /// permissions.
    #[error("decryption not authorized: {reason}. {remediation}")]
    AuthorizationDenied { reason: String, remediation: String },

    /// A stored ciphertext handle is the zero sentinel or otherwise unusable.
    #[error("{field} ciphertext handle is missing or invalid")]
    InvalidHandle { field: EntryField },

    /// Anything that fits no other category. Always logged with full context.
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl DiaryError {
    /// Standard remediation text for a denied decryption authorization.
    ///
    /// Mock backends do not fully simulate the permission system, so stale
    /// handles commonly decrypt as "not authorized". Minting new handles by
    /// re-adding the entry is the documented recovery.
    pub fn authorization_denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
            remediation:
                "Re-add the entry to mint fresh encrypted handles with current permissions, \
                 wait for the transaction to confirm, then decrypt again."
                    .to_string(),
        }
    }
}

impl From<ChainError> for DiaryError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Rpc(msg) => Self::ConnectivityFailure(msg),
            ChainError::NoCode { address } => Self::ContractNotDeployed { address },
            ChainError::Reverted(msg) => Self::TransactionReverted(msg),
            ChainError::InvalidHandle { field } => Self::InvalidHandle { field },
            ChainError::InvalidAddress(msg) | ChainError::InvalidRpcUrl(msg) => {
                Self::ConfigurationMissing(msg)
            }
            ChainError::Contract(msg) => Self::Unknown(msg),
        }
    }
}

impl From<FhevmError> for DiaryError {
    fn from(err: FhevmError) -> Self {
        match err {
            FhevmError::NotAuthorized(reason) => Self::authorization_denied(reason),
            FhevmError::Encryption(msg) => Self::EncryptionFailed(msg),
            FhevmError::Keypair(msg) => Self::Unknown(format!("decryption keypair: {msg}")),
            FhevmError::Signature(msg) => Self::Unknown(format!("signature: {msg}")),
            FhevmError::Relayer(msg) => Self::ConnectivityFailure(msg),
            FhevmError::UnsupportedChain(id) => {
                Self::ConfigurationMissing(format!("no FHE backend configured for chain {id}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_denied_mentions_re_adding() {
        let err = DiaryError::authorization_denied("handle not granted");
        let text = err.to_string();
        assert!(text.contains("not authorized"));
        assert!(text.to_lowercase().contains("re-add"));
    }

    #[test]
    fn chain_errors_map_to_distinct_categories() {
        let down: DiaryError = ChainError::Rpc("connection refused".into()).into();
        assert!(matches!(down, DiaryError::ConnectivityFailure(_)));

        let missing: DiaryError = ChainError::NoCode {
            address: "0xabc".into(),
        }
        .into();
        assert!(matches!(missing, DiaryError::ContractNotDeployed { .. }));

        let reverted: DiaryError = ChainError::Reverted("out of gas".into()).into();
        assert!(matches!(reverted, DiaryError::TransactionReverted(_)));

        let handle: DiaryError = ChainError::InvalidHandle {
            field: EntryField::Stress,
        }
        .into();
        assert_eq!(
            handle.to_string(),
            "stress ciphertext handle is missing or invalid"
        );
    }

    #[test]
    fn keypair_failure_is_not_reported_as_an_encryption_failure() {
        let err: DiaryError = FhevmError::Keypair("raw key is 16 bytes, need 32".into()).into();
        assert!(matches!(err, DiaryError::Unknown(_)));
        assert!(err.to_string().contains("keypair"));
        assert!(!err.to_string().contains("encryption failed"));
    }

    #[test]
    fn fhevm_denial_carries_remediation() {
        let err: DiaryError = FhevmError::NotAuthorized("user mismatch".into()).into();
        match err {
            DiaryError::AuthorizationDenied { remediation, .. } => {
                assert!(remediation.contains("Re-add"));
            }
            other => panic!("expected AuthorizationDenied, got {other:?}"),
        }
    }
}
