// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rate limit subject derived from request metadata.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Subject used when nothing identifies the caller.
pub const ANONYMOUS: &str = "anonymous";

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    value.split(',').next()?.trim().parse().ok()
}

/// Identify the caller: the first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the socket peer, then [`ANONYMOUS`].
///
/// Forwarded headers are client-controlled unless a trusted proxy sets
/// them, so they are read only when `trust_forwarded` is on. Header values
/// that are not IP addresses are ignored.
pub fn subject_from_request(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> String {
    let forwarded = trust_forwarded
        .then(|| header_ip(headers, FORWARDED_FOR).or_else(|| header_ip(headers, REAL_IP)))
        .flatten();

    forwarded
        .or_else(|| peer.map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}
