//! Log redaction for identifiers that can link output back to a person.
//!
//! Session ids, e-mail addresses, phone numbers and medical record numbers
//! are replaced before a formatted log line reaches its sink. Symptom names
//! and probabilities pass through untouched.
//!
//! Input is capped at `DIAGNOSTICA_SANITIZE_MAX_BYTES` (16 KiB by default)
//! per call.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static REDACTION_RULES: OnceLock<RedactionRules> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const RULES: [(&str, &str); 4] = [
    (
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        "[REDACTED-UUID]",
    ),
    (r"(?i)\bMRN[:#\s]?\s?\d{6,10}\b", "[REDACTED-MRN]"),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"(?:\+?1[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s][0-9]{3}[-.\s][0-9]{4}\b",
        "[REDACTED-PHONE]",
    ),
];

struct Redaction {
    regex: Regex,
    replacement: &'static str,
}

struct RedactionRules {
    any: RegexSet,
    rules: Vec<Redaction>,
}

fn rules() -> &'static RedactionRules {
    REDACTION_RULES.get_or_init(|| RedactionRules {
        any: RegexSet::new(RULES.iter().map(|(p, _)| *p)).expect("Valid regex set"),
        rules: RULES
            .iter()
            .map(|(pattern, replacement)| Redaction {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect(),
    })
}

fn max_sanitize_bytes() -> usize {
    std::env::var("DIAGNOSTICA_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Longest prefix of `input` within `max_bytes`, cut on a char boundary.
fn capped(input: &str, max_bytes: usize) -> Option<&str> {
    if input.len() <= max_bytes {
        return None;
    }
    let cut = input
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    Some(&input[..cut])
}

/// Redact identifiers from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let rules = rules();
    let truncated = capped(input, max_bytes);
    let text = truncated.unwrap_or(input);

    let redacted = rules
        .any
        .matches(text)
        .into_iter()
        .fold(text.to_string(), |acc, idx| {
            let rule = &rules.rules[idx];
            rule.regex.replace_all(&acc, rule.replacement).into_owned()
        });

    match truncated {
        Some(_) => format!("{redacted} [TRUNCATED]"),
        None => redacted,
    }
}

/// Whether `input` contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_identifier(input: &str) -> bool {
    let limit = max_sanitize_bytes();
    rules().any.is_match(capped(input, limit).unwrap_or(input))
}

/// `MakeWriter` wrapper that redacts each formatted log line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            sink: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

/// Writer produced by [`SanitizingMakeWriter`].
///
/// Bytes are held until a newline arrives so a pattern is never split
/// across two writes.
pub struct SanitizingWriter<W: std::io::Write> {
    sink: W,
    pending: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn emit(&mut self, upto: usize) -> std::io::Result<()> {
        let chunk: Vec<u8> = self.pending.drain(..upto).collect();
        let redacted = sanitize(&String::from_utf8_lossy(&chunk));
        self.sink.write_all(redacted.as_bytes())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);

        if let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') {
            self.emit(last_newline + 1)?;
        } else if self.pending.len() > max_sanitize_bytes().saturating_mul(2) {
            // unterminated line past the cap
            self.emit(self.pending.len())?;
            self.sink.write_all(b"\n")?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            self.emit(self.pending.len())?;
        }
        self.sink.flush()
    }
}
