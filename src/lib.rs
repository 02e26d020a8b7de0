// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! HealLock - Confidential Mental-Health Diary Client
//!
//! This crate implements the client-side workflow for recording daily
//! mental-health metrics as fully-homomorphically-encrypted values on an
//! Ethereum-compatible chain and decrypting them under a signed EIP-712
//! authorization.
//!
//! ## Modules
//!
//! - `blockchain` - Diary contract access over JSON-RPC (alloy)
//! - `fhe` - FHE backend contract: mock and relayer implementations
//! - `diary` - The orchestrator tying chain and FHE together
//! - `error` - User-facing failure taxonomy
//! - `config` - Environment variables and named tuning constants

pub mod blockchain;
pub mod config;
pub mod diary;
pub mod error;
pub mod fhe;

pub use diary::{DecryptOutcome, DiaryOrchestrator, LiveChain, TimestampedEntry};
pub use error::DiaryError;
