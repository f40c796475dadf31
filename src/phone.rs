//! Phone number normalization shared by the lead processor and the dispatcher.
//!
//! One policy, two forms:
//! - the *digits* form (`5551234567`) used to decide whether a lead is callable;
//! - the *submission* form (`+5551234567`) sent to the calling API.
//!
//! Rules, in order:
//! 1. A trailing extension (`ext 12`, `ext. 12`, `x12`, `#12`) is dropped.
//! 2. Every non-digit character is removed.
//! 3. A leading international `00` prefix is treated like `+` and removed.
//! 4. The remaining digit count must be within E.164 bounds (7..=15).
//!
//! The country code is never guessed: the sheet is expected to carry it.
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Shortest digit string accepted as a dialable number.
pub const MIN_DIGITS: usize = 7;
/// E.164 maximum number length.
pub const MAX_DIGITS: usize = 15;

/// Why a raw phone string could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneRejection {
    /// No digits at all (blank cell, placeholder text).
    Empty,
    /// Fewer than [`MIN_DIGITS`] digits.
    TooShort(usize),
    /// More than [`MAX_DIGITS`] digits.
    TooLong(usize),
}

impl fmt::Display for PhoneRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhoneRejection::Empty => write!(f, "no digits"),
            PhoneRejection::TooShort(n) => {
                write!(f, "{} digits, need at least {}", n, MIN_DIGITS)
            }
            PhoneRejection::TooLong(n) => write!(f, "{} digits, at most {} allowed", n, MAX_DIGITS),
        }
    }
}

/// A validated phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPhone {
    digits: String,
}

impl NormalizedPhone {
    /// Digits only, no prefix.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// The form submitted to the calling API: `+` followed by the digits.
    pub fn submission(&self) -> String {
        format!("+{}", self.digits)
    }
}

impl fmt::Display for NormalizedPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.digits)
    }
}

fn extension_regex() -> &'static Regex {
    static EXTENSION: OnceLock<Regex> = OnceLock::new();
    EXTENSION.get_or_init(|| {
        Regex::new(r"(?i)\s*(?:ext\.?|extension|x|#)\s*\d{1,6}\s*$")
            .expect("extension pattern is a valid regex")
    })
}

/// Reduces a raw phone string to digits (rules 1–3), without length checks.
pub fn digits_only(raw: &str) -> String {
    let without_extension = extension_regex().replace(raw.trim(), "");
    let digits: String = without_extension
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    match digits.strip_prefix("00") {
        Some(rest) if !without_extension.trim_start().starts_with('+') => rest.to_string(),
        _ => digits,
    }
}

/// Normalizes a raw phone string into a validated [`NormalizedPhone`].
pub fn normalize(raw: &str) -> Result<NormalizedPhone, PhoneRejection> {
    let digits = digits_only(raw);

    match digits.len() {
        0 => Err(PhoneRejection::Empty),
        n if n < MIN_DIGITS => Err(PhoneRejection::TooShort(n)),
        n if n > MAX_DIGITS => Err(PhoneRejection::TooLong(n)),
        _ => Ok(NormalizedPhone { digits }),
    }
}

/// Submission form of `raw`, or `None` when it is not a dialable number.
pub fn submission_form(raw: &str) -> Option<String> {
    normalize(raw).ok().map(|phone| phone.submission())
}
