// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (command auth, security headers).

pub mod command_auth;
pub mod security;

pub use command_auth::require_command_auth;
