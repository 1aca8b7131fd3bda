//! Phone number normalization to E.164.
//!
//! The notification bridge only accepts E.164 (`+` followed by up to 15
//! digits). Club members enter numbers however they like, so everything is
//! funnelled through [`normalize`] before it is stored or handed to the
//! bridge. Parsing and validation use libphonenumber metadata; national
//! numbers without a country code are read as US numbers, the club's home
//! region.

use std::fmt;

use phonenumber::country;
use phonenumber::Mode;
use serde::Serialize;

use crate::error::CoreError;

/// Region assumed for numbers written without a country code.
pub const DEFAULT_REGION: country::Id = country::Id::US;

/// A phone number in E.164 form, e.g. `+14155550123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct E164(String);

impl E164 {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for E164 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for E164 {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize user input to E.164.
///
/// Accepts `(415) 555-0123`, `415.555.0123`, `1-415-555-0123`,
/// `+44 121 234 5678` and the like. The number must be valid for its
/// region. Already-normalized input comes back unchanged.
pub fn normalize(raw: &str) -> Result<E164, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("phone number is required".into()));
    }

    let number = phonenumber::parse(Some(DEFAULT_REGION), trimmed)
        .map_err(|e| CoreError::Validation(format!("'{raw}' is not a valid phone number: {e}")))?;
    if !phonenumber::is_valid(&number) {
        return Err(CoreError::Validation(format!(
            "'{raw}' is not a valid phone number"
        )));
    }

    Ok(E164(number.format().mode(Mode::E164).to_string()))
}
