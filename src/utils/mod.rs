// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Utility modules
//!
//! Common utilities for the assetflow CLI and steps.

pub mod colors;
pub mod process;

pub use colors::*;
