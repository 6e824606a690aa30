//! Credential import from `KEY=VALUE` text
//!
//! Accepts the loose formats people keep API keys in: `.env` files, shell
//! `export` lines, `KEY: value` notes, quoted or bare values. Each key is
//! matched against a fixed synonym table that maps the common names for the
//! four X API secrets onto their canonical [`Slot`].
//!
//! ```
//! use libxwrite::import::parse;
//!
//! let text = "\
//! # X developer portal
//! CONSUMER_KEY=abc
//! export CONSUMER_SECRET=\"def\"
//! ACCESS_TOKEN: ghi
//! ACCESS_TOKEN_SECRET='jkl'
//! ";
//! let set = parse(text).unwrap();
//! assert_eq!(set.api_secret(), "def");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use zeroize::Zeroizing;

use crate::credentials::{CredentialSet, Slot};
use crate::error::ImportError;

/// Accepted key names and the slot each one fills
const SYNONYMS: [(&str, Slot); 15] = [
    ("API_KEY", Slot::ApiKey),
    ("CONSUMER_KEY", Slot::ApiKey),
    ("TWITTER_API_KEY", Slot::ApiKey),
    ("X_API_KEY", Slot::ApiKey),
    ("API_SECRET", Slot::ApiSecret),
    ("CONSUMER_SECRET", Slot::ApiSecret),
    ("TWITTER_API_SECRET", Slot::ApiSecret),
    ("X_API_SECRET", Slot::ApiSecret),
    ("ACCESS_TOKEN", Slot::AccessToken),
    ("TWITTER_ACCESS_TOKEN", Slot::AccessToken),
    ("X_ACCESS_TOKEN", Slot::AccessToken),
    ("ACCESS_SECRET", Slot::AccessSecret),
    ("ACCESS_TOKEN_SECRET", Slot::AccessSecret),
    ("TWITTER_ACCESS_SECRET", Slot::AccessSecret),
    ("X_ACCESS_SECRET", Slot::AccessSecret),
];

static SYNONYM_TABLE: Lazy<HashMap<&'static str, Slot>> =
    Lazy::new(|| SYNONYMS.iter().copied().collect());

// KEY, then `=` or `:`, then the value with optional surrounding quotes
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([^=:]+)[=:]\s*["']?([^"']+)["']?$"#).expect("line pattern is valid")
});

static EXPORT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^EXPORT\s+").expect("export pattern is valid"));

/// Canonical slot for an uppercase key name
pub fn lookup(key: &str) -> Option<Slot> {
    SYNONYM_TABLE.get(key).copied()
}

/// Every accepted key name for `slot`, canonical name first
pub fn synonyms_for(slot: Slot) -> Vec<&'static str> {
    SYNONYMS
        .iter()
        .filter(|(_, s)| *s == slot)
        .map(|(name, _)| *name)
        .collect()
}

/// Slots found so far during an import
#[derive(Default)]
pub struct PartialCredentials {
    values: BTreeMap<Slot, Zeroizing<String>>,
}

impl PartialCredentials {
    /// Whether `slot` holds a non-empty value
    pub fn contains(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    /// Value assigned to `slot`; an empty assignment counts as none
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values
            .get(&slot)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Canonical slots with no value, in slot order
    pub fn missing(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| !self.contains(*slot))
            .collect()
    }

    fn assign(&mut self, slot: Slot, value: String) {
        self.values.insert(slot, Zeroizing::new(value));
    }

    fn take(&mut self, slot: Slot) -> String {
        self.values
            .get_mut(&slot)
            .map(|v| std::mem::take(&mut **v))
            .unwrap_or_default()
    }

    /// Promote to a full set, or report which slots are missing
    pub fn into_set(mut self) -> Result<CredentialSet, ImportError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ImportError::MissingFields(missing));
        }

        Ok(CredentialSet::new(
            self.take(Slot::ApiKey),
            self.take(Slot::ApiSecret),
            self.take(Slot::AccessToken),
            self.take(Slot::AccessSecret),
        ))
    }
}

/// Split one line into a cleaned key and value
fn parse_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let captures = LINE_PATTERN.captures(trimmed)?;
    let key = captures[1].trim().to_uppercase();
    let key = EXPORT_PREFIX.replace(&key, "").into_owned();

    let value = captures[2].trim();
    let value = value
        .strip_suffix(|c: char| c == '"' || c == '\'')
        .unwrap_or(value);

    Some((key, value.to_string()))
}

/// Collect every recognized assignment without checking completeness
///
/// Unrecognized lines and unknown keys are skipped. When a slot is assigned
/// more than once the last value wins.
pub fn parse_partial(text: &str) -> PartialCredentials {
    let mut found = PartialCredentials::default();

    for (number, line) in text.lines().enumerate() {
        let Some((key, value)) = parse_line(line) else {
            continue;
        };

        match lookup(&key) {
            Some(slot) => {
                if found.values.contains_key(&slot) {
                    tracing::debug!("Line {}: {} overrides earlier {}", number + 1, key, slot);
                }
                found.assign(slot, value);
            }
            None => tracing::trace!("Line {}: ignoring unknown key {}", number + 1, key),
        }
    }

    found
}

/// Parse credential text into a complete set
///
/// # Errors
///
/// Returns `ImportError::MissingFields` naming every canonical field that
/// was not found, in slot order.
pub fn parse(text: &str) -> Result<CredentialSet, ImportError> {
    parse_partial(text).into_set()
}

/// Read a UTF-8 credentials file and parse it
pub fn import_file(path: &Path) -> Result<CredentialSet, ImportError> {
    let content = Zeroizing::new(std::fs::read_to_string(path)?);
    tracing::debug!("Parsing credentials from {}", path.display());
    parse(&content)
}
