// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Markup sanitizer for user-submitted documents.
//!
//! This is a bounded text rewriter, not a DOM parser. It runs four ordered
//! passes:
//!
//! 1. External `<script src>` / `<link href>` tags are kept verbatim when
//!    their host contains an allow-list entry, and deleted otherwise.
//! 2. Inline `<script>` bodies are kept only if they look like a plain
//!    configuration assignment with no access to globals, evaluation or
//!    network primitives.
//! 3. (strict mode only) `on*=` handler attributes, `javascript:` schemes
//!    and meta refresh tags are stripped until none remain.
//! 4. Kept tags are restored in place.
//!
//! Kept tags are swapped for opaque placeholder tokens between passes 1
//! and 4 so that pass 3 cannot touch them. Tokens carry a nonce derived
//! from the input, which keeps the function deterministic while making a
//! forged token in the input impractical.
//!
//! Residual risk: markup that a browser parses differently from these
//! patterns (entity-encoded attribute names, broken quoting) can slip
//! through. Permissive output must only be served inside a sandbox.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use url::Url;

/// Upper bound on neutralization rounds. Each round only ever shrinks the
/// text, so this is reached only by adversarial nesting.
const MAX_NEUTRALIZE_ROUNDS: usize = 16;

/// A script element with its attribute list in group 1. Quoted values may
/// contain `>`.
static SCRIPT_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script\b((?:"[^"]*"|'[^']*'|[^>"'])*)>(?:.*?</script\s*>)?"#)
        .expect("script element pattern is valid")
});

static LINK_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<link\b((?:"[^"]*"|'[^']*'|[^>"'])*)>"#)
        .expect("link element pattern is valid")
});

/// One attribute: name, then an optional double-quoted, single-quoted or
/// bare value.
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern is valid")
});

static INLINE_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("inline script pattern is valid")
});

/// Any script element or unterminated script opening tag.
static STRAY_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*(?:>(?:.*?</script\s*>)?)?")
        .expect("stray script pattern is valid")
});

static CONFIG_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[A-Za-z_]\w*\.config|(?:var|let|const)\s+[A-Za-z_]\w*[Cc]onfig)\s*=\s*\{",
    )
    .expect("config marker pattern is valid")
});

static FORBIDDEN_INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:eval|Function|atob|document|window|self|top|parent|frames|opener|globalThis|fetch|XMLHttpRequest|WebSocket|EventSource|sendBeacon|importScripts|import|require|localStorage|sessionStorage|indexedDB|cookie|location|setTimeout|setInterval|constructor|__proto__)\b|\\[ux]",
    )
    .expect("forbidden inline pattern is valid")
});

static HANDLER_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)[\s/]*\bon\w+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#)
        .expect("handler attribute pattern is valid")
});

static JAVASCRIPT_SCHEME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)j\s*a\s*v\s*a\s*s\s*c\s*r\s*i\s*p\s*t\s*(?::|&colon;|&#0*58;?|&#x0*3a;?)",
    )
    .expect("javascript scheme pattern is valid")
});

static META_REFRESH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\b[^>]*\bhttp-equiv\s*=\s*["']?\s*refresh\b[^>]*>"#)
        .expect("meta refresh pattern is valid")
});

static INTER_TAG_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r">\s+<").expect("whitespace pattern is valid"));

/// How much of the neutralization pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizeMode {
    /// All four passes. For output rendered without a script sandbox.
    #[default]
    Strict,
    /// Skips generic neutralization. Only for delivery contexts that
    /// isolate script execution themselves.
    Permissive,
}

impl std::str::FromStr for SanitizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(format!("unknown sanitize mode: {}", other)),
        }
    }
}

impl std::fmt::Display for SanitizeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Permissive => write!(f, "permissive"),
        }
    }
}

/// What a sanitize call kept and removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SanitizeReport {
    pub external_kept: usize,
    pub external_removed: usize,
    pub inline_kept: usize,
    pub inline_removed: usize,
    pub handlers_stripped: usize,
    pub schemes_stripped: usize,
    pub meta_refresh_stripped: usize,
}

impl SanitizeReport {
    /// Total number of removals of any kind.
    pub fn removals(&self) -> usize {
        self.external_removed
            + self.inline_removed
            + self.handlers_stripped
            + self.schemes_stripped
            + self.meta_refresh_stripped
    }
}

/// Sanitize `raw` markup. Never fails.
pub fn sanitize(raw: &str, allow_list: &[String], mode: SanitizeMode) -> String {
    sanitize_with_report(raw, allow_list, mode).0
}

/// Sanitize `raw` markup and report what was changed.
pub fn sanitize_with_report(
    raw: &str,
    allow_list: &[String],
    mode: SanitizeMode,
) -> (String, SanitizeReport) {
    let mut report = SanitizeReport::default();
    let mut vault = Vault::for_input(raw);

    let text = extract_external(raw, allow_list, &mut vault, &mut report);
    let text = triage_inline(&text, &mut vault, &mut report);
    let text = match mode {
        SanitizeMode::Strict => neutralize(text, &mut report),
        SanitizeMode::Permissive => text,
    };

    (vault.restore(text), report)
}

/// Collapse whitespace between tags.
pub fn compact(markup: &str) -> String {
    INTER_TAG_WHITESPACE
        .replace_all(markup.trim(), "><")
        .into_owned()
}

/// Holds kept tags while the destructive passes run.
struct Vault {
    nonce: String,
    kept: Vec<String>,
}

impl Vault {
    fn for_input(raw: &str) -> Self {
        let hash = blake3::hash(raw.as_bytes());
        Self {
            nonce: hash.to_hex().as_str()[..16].to_string(),
            kept: Vec::new(),
        }
    }

    fn token(&self, index: usize) -> String {
        // Alphanumeric only, terminated so index 1 is not a prefix of 12.
        format!("sgkeep{}x{}x", self.nonce, index)
    }

    fn keep(&mut self, tag: &str) -> String {
        let token = self.token(self.kept.len());
        self.kept.push(tag.to_string());
        token
    }

    fn restore(&self, mut text: String) -> String {
        // Reverse order: a later capture may contain an earlier token.
        for (index, tag) in self.kept.iter().enumerate().rev() {
            text = text.replace(&self.token(index), tag);
        }
        text
    }
}

/// Value of the first attribute called `name`. `None` when the attribute
/// is absent, `Some("")` when it has no value.
fn attribute_value<'t>(attributes: &'t str, name: &str) -> Option<&'t str> {
    ATTRIBUTE.captures_iter(attributes).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case(name) {
            return None;
        }
        Some(
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str()),
        )
    })
}

/// Lowercased host of an absolute or protocol-relative http(s) URL.
fn reference_host(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let parsed = if reference.starts_with("//") {
        Url::parse(&format!("https:{}", reference))
    } else {
        Url::parse(reference)
    };
    let url = parsed.ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().map(|h| h.to_ascii_lowercase())
}

fn is_trusted(host: &str, allow_list: &[String]) -> bool {
    allow_list
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .any(|entry| host.contains(&entry.to_ascii_lowercase()))
}

/// Vault an element whose `url_attribute` points at an allow-listed host,
/// delete it otherwise. Elements without the attribute are left alone.
fn keep_if_trusted(
    caps: &Captures,
    url_attribute: &str,
    allow_list: &[String],
    vault: &mut Vault,
    report: &mut SanitizeReport,
) -> String {
    let Some(reference) = attribute_value(&caps[1], url_attribute) else {
        return caps[0].to_string();
    };
    let trusted = reference_host(reference).map_or(false, |host| is_trusted(&host, allow_list));
    if trusted {
        report.external_kept += 1;
        vault.keep(&caps[0])
    } else {
        report.external_removed += 1;
        String::new()
    }
}

fn extract_external(
    raw: &str,
    allow_list: &[String],
    vault: &mut Vault,
    report: &mut SanitizeReport,
) -> String {
    let text = SCRIPT_ELEMENT
        .replace_all(raw, |caps: &Captures| {
            keep_if_trusted(caps, "src", allow_list, vault, report)
        })
        .into_owned();
    LINK_ELEMENT
        .replace_all(&text, |caps: &Captures| {
            keep_if_trusted(caps, "href", allow_list, vault, report)
        })
        .into_owned()
}

/// Whether an inline script body is a plain configuration assignment.
fn is_safe_inline(body: &str) -> bool {
    CONFIG_MARKER.is_match(body) && !FORBIDDEN_INLINE.is_match(body)
}

fn triage_inline(text: &str, vault: &mut Vault, report: &mut SanitizeReport) -> String {
    let text = INLINE_SCRIPT.replace_all(text, |caps: &Captures| {
        if is_safe_inline(&caps[1]) {
            report.inline_kept += 1;
            vault.keep(&caps[0])
        } else {
            report.inline_removed += 1;
            String::new()
        }
    });

    // Whatever is left is an unterminated opening tag.
    STRAY_SCRIPT
        .replace_all(&text, |_: &Captures| {
            report.inline_removed += 1;
            String::new()
        })
        .into_owned()
}

/// Remove every match of `pattern`, counting them. `None` if nothing matched.
fn strip_all(pattern: &Regex, text: &str, counter: &mut usize) -> Option<String> {
    let hits = pattern.find_iter(text).count();
    if hits == 0 {
        return None;
    }
    *counter += hits;
    Some(pattern.replace_all(text, "").into_owned())
}

fn neutralize(mut text: String, report: &mut SanitizeReport) -> String {
    for _ in 0..MAX_NEUTRALIZE_ROUNDS {
        let mut changed = false;

        if let Some(next) = strip_all(&HANDLER_ATTR, &text, &mut report.handlers_stripped) {
            text = next;
            changed = true;
        }
        if let Some(next) = strip_all(&JAVASCRIPT_SCHEME, &text, &mut report.schemes_stripped) {
            text = next;
            changed = true;
        }
        if let Some(next) = strip_all(&META_REFRESH, &text, &mut report.meta_refresh_stripped) {
            text = next;
            changed = true;
        }
        // A removal above can splice a new script tag together.
        if let Some(next) = strip_all(&STRAY_SCRIPT, &text, &mut report.inline_removed) {
            text = next;
            changed = true;
        }

        if !changed {
            break;
        }
    }
    text
}
