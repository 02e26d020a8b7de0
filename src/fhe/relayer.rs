// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! HTTP client for the production FHE relayer gateway.
//!
//! The gateway fronts the vendor FHE SDK: it builds input proofs, mints
//! ciphertext handles, and executes user-decryptions against the KMS. This
//! client is deliberately thin; all protocol decisions (EIP-712 digest,
//! validity window, signature convention) are made by the caller and the
//! gateway only verifies them. Key material coming back from the gateway is
//! normalized through [`super::keypair::KeyMaterial`] since its encoding has
//! varied across gateway versions.

use std::time::Duration;

use alloy::primitives::B256;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::keypair::{DecryptionKeypair, KeyMaterial};
use super::{
    CiphertextHandles, DecryptedValues, EncryptedInput, Fhevm, FhevmCapabilities, FhevmConfig,
    FhevmError, UserDecryptRequest,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a remote FHE relayer gateway.
#[derive(Debug, Clone)]
pub struct RelayerFhevm {
    http: Client,
    base_url: String,
    config: FhevmConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptInputBody {
    contract_address: String,
    user_address: String,
    values: Vec<u32>,
    acl_address: String,
    input_verifier_address: String,
    chain_id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptInputResponse {
    handles: Vec<String>,
    input_proof: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HandlePairBody {
    handle: String,
    contract_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDecryptBody {
    handle_contract_pairs: Vec<HandlePairBody>,
    public_key: String,
    private_key: String,
    signature: String,
    contract_addresses: Vec<String>,
    user_address: String,
    start_timestamp: u64,
    duration_days: u64,
    kms_verifier_address: String,
}

impl RelayerFhevm {
    /// Create a client for the gateway at `base_url`.
    pub fn new(config: FhevmConfig, base_url: String) -> Result<Self, FhevmError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FhevmError::Relayer(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, FhevmError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| FhevmError::Relayer(format!("POST {url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let detail = response.text().await.unwrap_or_default();
            return Err(FhevmError::NotAuthorized(format!(
                "relayer refused the request: {detail}"
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FhevmError::Relayer(format!("{url} returned {status}: {detail}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FhevmError::Relayer(format!("{url} returned invalid JSON: {e}")))
    }

    fn parse_handle(raw: &str) -> Result<B256, FhevmError> {
        raw.parse::<B256>()
            .map_err(|e| FhevmError::Relayer(format!("gateway returned malformed handle {raw}: {e}")))
    }
}

impl Fhevm for RelayerFhevm {
    fn capabilities(&self) -> FhevmCapabilities {
        FhevmCapabilities::RELAYER
    }

    async fn generate_keypair(&self) -> Result<DecryptionKeypair, FhevmError> {
        let value = self.post_json("/v1/keypair", &serde_json::json!({})).await?;

        let public = value
            .get("publicKey")
            .cloned()
            .ok_or_else(|| FhevmError::Keypair("gateway keypair lacks publicKey".into()))?;
        let private = value
            .get("privateKey")
            .cloned()
            .ok_or_else(|| FhevmError::Keypair("gateway keypair lacks privateKey".into()))?;

        // Gateway encodings have drifted between versions; normalize both
        // parts rather than trusting the shape.
        DecryptionKeypair::from_material(
            KeyMaterial::WrappedObject(public),
            KeyMaterial::WrappedObject(private),
        )
    }

    async fn encrypt_input(&self, input: EncryptedInput) -> Result<CiphertextHandles, FhevmError> {
        if input.values.is_empty() {
            return Err(FhevmError::Encryption("input batch is empty".into()));
        }

        let body = EncryptInputBody {
            contract_address: input.contract.to_string(),
            user_address: input.user.to_string(),
            values: input.values.clone(),
            acl_address: self.config.acl_address.to_string(),
            input_verifier_address: self.config.input_verifier_address.to_string(),
            chain_id: self.config.chain_id,
        };

        let value = self.post_json("/v1/encrypt-input", &body).await?;
        let parsed: EncryptInputResponse = serde_json::from_value(value)
            .map_err(|e| FhevmError::Encryption(format!("malformed gateway response: {e}")))?;

        if parsed.handles.len() != input.values.len() {
            return Err(FhevmError::Encryption(format!(
                "gateway returned {} handles for {} values",
                parsed.handles.len(),
                input.values.len()
            )));
        }

        let handles = parsed
            .handles
            .iter()
            .map(|h| Self::parse_handle(h))
            .collect::<Result<Vec<_>, _>>()?;

        let input_proof = alloy::hex::decode(parsed.input_proof.trim_start_matches("0x"))
            .map_err(|e| FhevmError::Encryption(format!("malformed input proof: {e}")))?;

        Ok(CiphertextHandles {
            handles,
            input_proof,
        })
    }

    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<DecryptedValues, FhevmError> {
        let body = UserDecryptBody {
            handle_contract_pairs: request
                .handle_pairs
                .iter()
                .map(|pair| HandlePairBody {
                    handle: format!("{:?}", pair.handle),
                    contract_address: pair.contract.to_string(),
                })
                .collect(),
            public_key: format!("0x{}", alloy::hex::encode(request.public_key)),
            private_key: format!("0x{}", alloy::hex::encode(request.private_key)),
            signature: request.signature.clone(),
            contract_addresses: request
                .contract_addresses
                .iter()
                .map(|a| a.to_string())
                .collect(),
            user_address: request.user.to_string(),
            start_timestamp: request.start_timestamp,
            duration_days: request.duration_days,
            kms_verifier_address: self.config.kms_verifier_address.to_string(),
        };

        let value = self.post_json("/v1/user-decrypt", &body).await?;
        let map = value.as_object().ok_or_else(|| {
            FhevmError::Relayer("gateway decrypt response is not an object".into())
        })?;

        let mut values = DecryptedValues::default();
        for (handle_hex, plaintext) in map {
            let handle = Self::parse_handle(handle_hex)?;
            let number = plaintext
                .as_u64()
                .or_else(|| plaintext.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| {
                    FhevmError::Relayer(format!(
                        "gateway plaintext for {handle_hex} is not a number"
                    ))
                })?;
            values.insert(handle, number);
        }
        Ok(values)
    }
}
