// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Diary contract interface.
//!
//! The contract itself is an external collaborator with a fixed ABI; only
//! its interface is declared here.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IEncryptedDiary {
        function addEntry(uint256 date, bytes32 encryptedMentalStateHandle, bytes32 encryptedStressHandle) external;
        function getEntry(address user, uint256 date) external view returns (bytes32 mentalStateHandle, bytes32 stressHandle, uint256 timestamp);
        function getMentalStateHandle(address user, uint256 date) external view returns (bytes32);
        function getStressHandle(address user, uint256 date) external view returns (bytes32);
        function entryExists(address user, uint256 date) external view returns (bool);
        function getEntryCount(address user) external view returns (uint256);
        function getLastEntryDate(address user) external view returns (uint256);

        event EntryAdded(address indexed user, uint256 date, uint256 timestamp);
    }
}
