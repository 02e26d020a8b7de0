// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Local deployment tool.
//!
//! Takes no flags. Deploys the diary contract to the local Hardhat node
//! using the well-known account #0 key, waits for the deployment receipt,
//! and records the address in two places consumers read it from:
//! `.env.local` (`HEALLOCK_CONTRACT_ADDRESS=`) and
//! `deployments/localhost.json`. Exits non-zero on failure.

use std::path::Path;
use std::process::ExitCode;

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::Address,
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tracing_subscriber::EnvFilter;

use heallock::blockchain::LOCAL_HARDHAT;
use heallock::config::{ARTIFACT_ENV, CONTRACT_ADDRESS_ENV, LOCAL_DEPLOYER_KEY, RPC_URL_ENV};

const DEFAULT_ARTIFACT: &str = "artifacts/EncryptedMentalHealthDiary.json";
const ENV_FILE: &str = ".env.local";
const DEPLOYMENT_FILE: &str = "deployments/localhost.json";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(address) => {
            println!("Deployed EncryptedMentalHealthDiary at {address}");
            println!("Recorded in {ENV_FILE} and {DEPLOYMENT_FILE}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("deploy failed: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<Address, String> {
    let rpc_url =
        std::env::var(RPC_URL_ENV).unwrap_or_else(|_| LOCAL_HARDHAT.rpc_url.to_string());
    let artifact_path =
        std::env::var(ARTIFACT_ENV).unwrap_or_else(|_| DEFAULT_ARTIFACT.to_string());

    let bytecode = load_bytecode(Path::new(&artifact_path))?;

    let signer = PrivateKeySigner::from_slice(
        &alloy::hex::decode(LOCAL_DEPLOYER_KEY).map_err(|e| format!("deployer key: {e}"))?,
    )
    .map_err(|e| format!("deployer key: {e}"))?;
    let deployer = signer.address();
    let wallet = EthereumWallet::from(signer);

    let url: url::Url = rpc_url.parse().map_err(|e| format!("RPC URL {rpc_url}: {e}"))?;
    let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

    let block = provider
        .get_block_number()
        .await
        .map_err(|e| format!("node not reachable at {rpc_url}: {e} (start it with: npx hardhat node)"))?;
    println!("Deploying from {deployer} (node at block {block})");

    let tx = TransactionRequest::default().with_deploy_code(bytecode);
    let pending = provider
        .send_transaction(tx)
        .await
        .map_err(|e| format!("sending deployment transaction: {e}"))?;
    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| format!("waiting for deployment receipt: {e}"))?;

    if !receipt.status() {
        return Err("deployment transaction reverted".to_string());
    }
    let address = receipt
        .contract_address
        .ok_or_else(|| "receipt carries no contract address".to_string())?;

    write_env_file(Path::new(ENV_FILE), address).map_err(|e| format!("{ENV_FILE}: {e}"))?;
    write_deployment_record(Path::new(DEPLOYMENT_FILE), address)
        .map_err(|e| format!("{DEPLOYMENT_FILE}: {e}"))?;

    Ok(address)
}

/// Read the `bytecode` field of a Hardhat-style artifact.
fn load_bytecode(path: &Path) -> Result<Vec<u8>, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read artifact {}: {e}", path.display()))?;
    let artifact: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| format!("artifact is not JSON: {e}"))?;
    let bytecode = artifact
        .get("bytecode")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "artifact has no string `bytecode` field".to_string())?;
    alloy::hex::decode(bytecode.trim_start_matches("0x"))
        .map_err(|e| format!("artifact bytecode is not hex: {e}"))
}

/// Update or append the contract address line, preserving the rest of the
/// env file.
fn write_env_file(path: &Path, address: Address) -> std::io::Result<()> {
    let existing = std::fs::read_to_string(path).unwrap_or_default();
    std::fs::write(path, upsert_env_line(&existing, address))
}

fn upsert_env_line(content: &str, address: Address) -> String {
    let line = format!("{CONTRACT_ADDRESS_ENV}={address}");
    let mut replaced = false;
    let mut out: Vec<String> = content
        .lines()
        .map(|l| {
            if l.starts_with(&format!("{CONTRACT_ADDRESS_ENV}=")) {
                replaced = true;
                line.clone()
            } else {
                l.to_string()
            }
        })
        .collect();
    if !replaced {
        out.push(line);
    }
    let mut joined = out.join("\n");
    joined.push('\n');
    joined
}

fn write_deployment_record(path: &Path, address: Address) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let record = serde_json::json!({
        "contract": "EncryptedMentalHealthDiary",
        "address": format!("{address}"),
        "chainId": LOCAL_HARDHAT.chain_id,
        "deployedAt": chrono::Utc::now().to_rfc3339(),
    });
    std::fs::write(path, serde_json::to_string_pretty(&record)?)
}
