// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of metrics-agent

pub mod config;
pub mod kubernetes;
