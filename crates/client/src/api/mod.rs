// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outgoing request path: the gatekeeper every API call goes through.

pub mod client;

pub use client::ApiClient;
