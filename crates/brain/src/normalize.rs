//! Query normalization.
//!
//! Collapses the multimodal input union into one canonical text
//! representation plus structured hints (device category, error codes).
//! Pure string work, no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::error::BrainError;
use crate::types::{CanonicalQuery, QueryHints, RawInput};

/// Error-code shapes: SEPARATED_CODES, hex literals, letter-digit codes.
/// Matched against the raw text before lowercasing.
static ERROR_CODE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"\b(?:[A-Z][A-Z0-9]+(?:[-_][A-Z0-9]+)+|0[xX][0-9A-Fa-f]{2,8}|[A-Z]{1,4}-?\d{2,5})\b")
    .expect("error-code pattern is valid")
});

/// "error code 1603" style phrases, any casing.
static ERROR_PHRASE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)\berror\s+code[:#\s]+([A-Za-z0-9_-]{2,})").expect("error-phrase pattern is valid")
});

/// Device categories and the keywords that imply them. First match wins,
/// scanned in this order. Categories mirror the problem catalog.
const DEVICE_KEYWORDS: &[(&str, &[&str])] = &[
  ("television", &["tv", "television", "hdmi", "screen flicker", "backlight"]),
  ("smartphone", &["phone", "smartphone", "iphone", "android", "mobile"]),
  ("smartwatch", &["smartwatch", "watch", "wearable"]),
  ("router", &["router", "modem", "access point"]),
  ("laptop", &["laptop", "notebook", "macbook", "keyboard"]),
  ("printer", &["printer", "toner", "cartridge", "paper jam"]),
  ("iot", &["smart bulb", "smart speaker", "smart plug", "thermostat", "doorbell"]),
];

/// Normalize a raw input (plus an optional free-text hint) into a canonical
/// query. Fails with [`BrainError::InvalidInput`] when no arm carries usable
/// text after trimming.
pub fn normalize(input: &RawInput, hint: Option<&str>) -> Result<CanonicalQuery, BrainError> {
  let payload = input.payload();
  let hint = hint.unwrap_or_default();

  let combined = format!("{payload} {hint}");
  if combined.trim().is_empty() {
    return Err(BrainError::invalid_input(describe_empty_arm(input)));
  }

  let error_codes = extract_error_codes(&combined);
  let text = canonicalize(&combined);
  let device_category = infer_device_category(&text);

  Ok(CanonicalQuery { text, hints: QueryHints { device_category, error_codes } })
}

fn describe_empty_arm(input: &RawInput) -> String {
  let arm = match input {
    RawInput::Text { .. } => "text query",
    RawInput::Audio { .. } => "audio transcript",
    RawInput::Image { .. } => "image-derived text",
    RawInput::Logs { .. } => "log summary",
  };
  format!("{arm} was empty")
}

/// Lowercase, collapse whitespace, trim.
fn canonicalize(raw: &str) -> String {
  raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Pull every error-code-shaped token out of the raw (pre-lowercase) text.
fn extract_error_codes(raw: &str) -> BTreeSet<String> {
  let mut codes = BTreeSet::new();

  for found in ERROR_CODE.find_iter(raw) {
    codes.insert(found.as_str().to_uppercase());
  }
  for captured in ERROR_PHRASE.captures_iter(raw) {
    if let Some(code) = captured.get(1) {
      codes.insert(code.as_str().to_uppercase());
    }
  }

  codes
}

/// Keyword scan over the canonical text. Multi-word keywords match as
/// substrings on word boundaries.
fn infer_device_category(canonical: &str) -> Option<String> {
  let padded = format!(" {canonical} ");

  for (category, keywords) in DEVICE_KEYWORDS {
    for keyword in *keywords {
      if padded.contains(&format!(" {keyword} ")) {
        return Some((*category).to_string());
      }
    }
  }

  None
}
