// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Local deployment diagnostics.
//!
//! Takes no flags. Runs the ordered checks a broken local setup needs:
//! node liveness, contract address resolution, bytecode presence, and two
//! probe calls against the contract. Prints human-readable pass/fail lines
//! and exits non-zero on the first failure.

use std::process::ExitCode;

use heallock::blockchain::{contract_address_for, parse_address, today, DiaryReader, LOCAL_HARDHAT};
use heallock::config::RPC_URL_ENV;
use tracing_subscriber::EnvFilter;

/// Hardhat development account used as the probe target; any address works
/// for view calls.
const PROBE_ADDRESS: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Diagnosing HealLock deployment...");

    let rpc_url =
        std::env::var(RPC_URL_ENV).unwrap_or_else(|_| LOCAL_HARDHAT.rpc_url.to_string());

    // 1. Contract address resolution.
    let address = match contract_address_for(LOCAL_HARDHAT.chain_id) {
        Some(addr) => addr,
        None => {
            println!("[1/4] FAIL no contract address configured for chain {}", LOCAL_HARDHAT.chain_id);
            return ExitCode::FAILURE;
        }
    };
    let contract = match parse_address(&address) {
        Ok(parsed) => parsed,
        Err(e) => {
            println!("[1/4] FAIL contract address {address} is invalid: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("[1/4] OK   contract address {address}");

    let reader = match DiaryReader::new(&rpc_url, contract) {
        Ok(reader) => reader,
        Err(e) => {
            println!("[2/4] FAIL cannot build RPC client for {rpc_url}: {e}");
            return ExitCode::FAILURE;
        }
    };

    // 2. Node liveness.
    match reader.block_number().await {
        Ok(block) => println!("[2/4] OK   node reachable at {rpc_url} (block {block})"),
        Err(e) => {
            println!("[2/4] FAIL node not reachable at {rpc_url}: {e}");
            println!("       start it with: npx hardhat node");
            return ExitCode::FAILURE;
        }
    }
    if let Ok(accounts) = reader.accounts().await {
        println!("       OK   node manages {} accounts", accounts.len());
    }

    // 3. Bytecode presence.
    match reader.code_exists().await {
        Ok(true) => println!("[3/4] OK   contract bytecode present"),
        Ok(false) => {
            println!("[3/4] FAIL no bytecode at {address}");
            println!("       deploy it with the `deploy` tool");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            println!("[3/4] FAIL bytecode check errored: {e}");
            return ExitCode::FAILURE;
        }
    }

    // 4. Contract probes.
    let probe = match parse_address(PROBE_ADDRESS) {
        Ok(addr) => addr,
        Err(e) => {
            println!("[4/4] FAIL probe address invalid: {e}");
            return ExitCode::FAILURE;
        }
    };
    match reader.entry_count(probe).await {
        Ok(count) => println!("[4/4] OK   getEntryCount({PROBE_ADDRESS}) = {count}"),
        Err(e) => {
            println!("[4/4] FAIL getEntryCount reverted: {e}");
            println!("       likely an ABI mismatch or a stale deployment");
            return ExitCode::FAILURE;
        }
    }
    match reader.entry_exists(probe, today()).await {
        Ok(exists) => println!("       OK   entryExists(today) = {exists}"),
        Err(e) => {
            println!("       FAIL entryExists reverted: {e}");
            return ExitCode::FAILURE;
        }
    }

    println!("All checks passed.");
    ExitCode::SUCCESS
}
