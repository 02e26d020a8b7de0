// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! EIP-712 user-decryption authorization.
//!
//! One signed `UserDecryptRequestVerification` message authorizes the FHE
//! backend to reveal the targeted handles to the session public key for a
//! bounded validity window. The domain is `{name: "FHEVM", version: "1"}`
//! with the first target contract as verifying contract, matching the
//! backend's verification.

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    signers::{local::PrivateKeySigner, Signer},
    sol,
    sol_types::{eip712_domain, Eip712Domain, SolStruct},
};

use super::{FhevmCapabilities, FhevmError};

sol! {
    /// Typed-data schema the backend verifies decryption requests against.
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 contractsChainId;
        uint256 startTimestamp;
        uint256 durationDays;
        bytes extraData;
    }
}

/// One decryption session's authorization parameters.
#[derive(Debug, Clone)]
pub struct DecryptAuthorization {
    pub public_key: [u8; 32],
    pub contract_addresses: Vec<Address>,
    pub chain_id: u64,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

impl DecryptAuthorization {
    /// Authorization starting now for the configured validity window.
    pub fn new(
        public_key: [u8; 32],
        contract_addresses: Vec<Address>,
        chain_id: u64,
    ) -> Result<Self, FhevmError> {
        if contract_addresses.is_empty() {
            return Err(FhevmError::Signature(
                "authorization needs at least one contract address".into(),
            ));
        }
        Ok(Self {
            public_key,
            contract_addresses,
            chain_id,
            start_timestamp: chrono::Utc::now().timestamp() as u64,
            duration_days: crate::config::DECRYPT_VALIDITY_DAYS,
        })
    }

    fn message(&self) -> UserDecryptRequestVerification {
        UserDecryptRequestVerification {
            publicKey: Bytes::copy_from_slice(&self.public_key),
            contractAddresses: self.contract_addresses.clone(),
            contractsChainId: U256::from(self.chain_id),
            startTimestamp: U256::from(self.start_timestamp),
            durationDays: U256::from(self.duration_days),
            extraData: Bytes::new(),
        }
    }

    fn domain(&self) -> Eip712Domain {
        eip712_domain! {
            name: "FHEVM",
            version: "1",
            chain_id: self.chain_id,
            verifying_contract: self.contract_addresses[0],
        }
    }

    /// The EIP-712 digest the wallet signs.
    pub fn signing_hash(&self) -> B256 {
        self.message().eip712_signing_hash(&self.domain())
    }

    /// Sign with the user's wallet key; returns the 65-byte signature as a
    /// 0x-prefixed hex string.
    pub async fn sign(&self, signer: &PrivateKeySigner) -> Result<String, FhevmError> {
        let signature = signer
            .sign_hash(&self.signing_hash())
            .await
            .map_err(|e| FhevmError::Signature(e.to_string()))?;
        Ok(format!("0x{}", alloy::hex::encode(signature.as_bytes())))
    }

    /// Recover the signer address from a bare (unprefixed) hex signature.
    pub fn recover(&self, signature_hex: &str) -> Result<Address, FhevmError> {
        let bytes = alloy::hex::decode(signature_hex)
            .map_err(|e| FhevmError::Signature(format!("signature is not hex: {e}")))?;
        let signature = alloy::primitives::Signature::try_from(bytes.as_slice())
            .map_err(|e| FhevmError::Signature(format!("malformed signature: {e}")))?;
        signature
            .recover_address_from_prehash(&self.signing_hash())
            .map_err(|e| FhevmError::Signature(format!("recovery failed: {e}")))
    }

    /// Whether `now` falls inside the declared validity window.
    pub fn is_valid_at(&self, now: u64) -> bool {
        let end = self
            .start_timestamp
            .saturating_add(self.duration_days.saturating_mul(86_400));
        now >= self.start_timestamp && now <= end
    }
}

/// Adjust a 0x-prefixed hex signature to the backend's convention.
///
/// The mock backend verifies against the bare hex form; the production
/// relayer takes the prefix as-is. The decision lives in the capability
/// flag, not in chain-ID comparisons at call sites.
pub fn adjust_signature(signature: String, capabilities: &FhevmCapabilities) -> String {
    if capabilities.strip_signature_prefix {
        signature
            .strip_prefix("0x")
            .map(str::to_string)
            .unwrap_or(signature)
    } else {
        signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(start: u64) -> DecryptAuthorization {
        DecryptAuthorization {
            public_key: [0x42; 32],
            contract_addresses: vec![Address::repeat_byte(0x11)],
            chain_id: 31337,
            start_timestamp: start,
            duration_days: 10,
        }
    }

    #[tokio::test]
    async fn signature_recovers_to_signer_address() {
        let signer = PrivateKeySigner::from_slice(&[0x07; 32]).unwrap();
        let auth = auth(1_700_000_000);

        let signature = auth.sign(&signer).await.unwrap();
        assert!(signature.starts_with("0x"));
        assert_eq!(signature.len(), 2 + 65 * 2);

        let bare = signature.strip_prefix("0x").unwrap();
        assert_eq!(auth.recover(bare).unwrap(), signer.address());
    }

    #[tokio::test]
    async fn tampered_message_recovers_to_different_address() {
        let signer = PrivateKeySigner::from_slice(&[0x07; 32]).unwrap();
        let auth = auth(1_700_000_000);
        let signature = auth.sign(&signer).await.unwrap();

        let mut tampered = auth.clone();
        tampered.duration_days = 9999;
        let recovered = tampered
            .recover(signature.strip_prefix("0x").unwrap())
            .unwrap();
        assert_ne!(recovered, signer.address());
    }

    #[test]
    fn empty_contract_list_is_rejected() {
        let result = DecryptAuthorization::new([0u8; 32], vec![], 31337);
        assert!(matches!(result, Err(FhevmError::Signature(_))));
    }

    #[test]
    fn validity_window_bounds() {
        let auth = auth(1_000);
        assert!(!auth.is_valid_at(999));
        assert!(auth.is_valid_at(1_000));
        assert!(auth.is_valid_at(1_000 + 10 * 86_400));
        assert!(!auth.is_valid_at(1_001 + 10 * 86_400));
    }

    #[test]
    fn prefix_stripped_only_for_mock_convention() {
        let sig = "0xabcdef".to_string();
        assert_eq!(
            adjust_signature(sig.clone(), &FhevmCapabilities::MOCK),
            "abcdef"
        );
        assert_eq!(
            adjust_signature(sig, &FhevmCapabilities::RELAYER),
            "0xabcdef"
        );
    }

    #[test]
    fn malformed_signature_is_a_descriptive_error() {
        let auth = auth(0);
        assert!(matches!(
            auth.recover("zz"),
            Err(FhevmError::Signature(_))
        ));
        assert!(matches!(
            auth.recover("abcd"),
            Err(FhevmError::Signature(_))
        ));
    }
}
