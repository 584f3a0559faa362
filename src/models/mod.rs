// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;
pub mod tier;

pub use account::{AccountUpdate, LinkedAccount, RefreshResult, Standing, TokenPair};
pub use tier::{Tier, TierTable, TierTableError};
