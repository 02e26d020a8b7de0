// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Blockchain integration module.
//!
//! This module provides:
//! - Typed read/write access to the diary contract over JSON-RPC
//! - Network configuration and contract address resolution
//! - Entry records with zero-handle sentinel validation

pub mod client;
pub mod contract;
pub mod types;

pub use client::{AddEntryReceipt, ChainError, DiaryReader, DiaryWriter};
pub use types::*;
