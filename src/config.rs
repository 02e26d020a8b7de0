// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and named tuning values used
//! throughout the application. Configuration is loaded from the environment
//! at startup; the tuning constants carry their rationale so they are never
//! anonymous magic numbers inside orchestration logic.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HEALLOCK_CONTRACT_ADDRESS` | Diary contract address override | Resolved by chain ID |
//! | `HEALLOCK_RPC_URL` | JSON-RPC endpoint override | Per-network default |
//! | `HEALLOCK_RELAYER_URL` | FHE relayer base URL (production chains) | Required off-localhost |
//! | `HEALLOCK_ARTIFACT` | Compiled contract artifact path (deploy tool) | `artifacts/EncryptedMentalHealthDiary.json` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::time::Duration;

/// Environment variable overriding the diary contract address.
///
/// When unset, the address is resolved from the chain ID via
/// [`crate::blockchain::contract_address_for`].
pub const CONTRACT_ADDRESS_ENV: &str = "HEALLOCK_CONTRACT_ADDRESS";

/// Environment variable overriding the JSON-RPC endpoint URL.
pub const RPC_URL_ENV: &str = "HEALLOCK_RPC_URL";

/// Environment variable naming the FHE relayer base URL.
///
/// Required for production chain IDs; ignored on the local mock chain.
pub const RELAYER_URL_ENV: &str = "HEALLOCK_RELAYER_URL";

/// Environment variable naming the compiled contract artifact for the
/// deployment tool (Hardhat-style JSON with `abi` and `bytecode` fields).
pub const ARTIFACT_ENV: &str = "HEALLOCK_ARTIFACT";

/// Gas ceiling for `addEntry` transactions.
///
/// FHEVM input verification makes gas estimation unreliable on the mock
/// chain, so submissions carry a fixed ceiling instead of an estimate. The
/// value is what the diary contract has been observed to need with two
/// encrypted inputs, with generous headroom.
pub const ADD_ENTRY_GAS_LIMIT: u64 = 5_000_000;

/// Delay imposed after an `addEntry` confirmation before the operation is
/// reported complete.
///
/// The FHE backend grants decryption permissions for freshly written handles
/// asynchronously. This wait tolerates that external propagation latency; it
/// is a timing assumption about the backend, not a correctness guarantee,
/// and decryption can still race it under load.
pub const PERMISSION_PROPAGATION_DELAY: Duration = Duration::from_secs(2);

/// Validity window, in days, of a signed user-decryption authorization.
///
/// Bounds how long a single EIP-712 signature can be replayed against the
/// relayer. Ten days matches what the diary contract's tooling grants.
pub const DECRYPT_VALIDITY_DAYS: u64 = 10;

/// Highest score accepted for either diary metric (mental state, stress).
pub const MAX_SCORE: u32 = 100;

/// Hardhat account #0 private key, used by the local deployment tool.
///
/// Well-known development key; never funds anything real.
pub const LOCAL_DEPLOYER_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
