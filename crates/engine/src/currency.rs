use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Target currency code requested by a caller.
///
/// Conversion is always from USD, so only the target side is modelled. The
/// code must be exactly three characters long and is kept exactly as
/// received (no case folding): it is echoed into rate records, cache keys and
/// responses verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Canonical currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(EngineError::MissingCurrency);
        }
        if value.chars().count() != 3 {
            return Err(EngineError::InvalidCurrency(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_three_characters_verbatim() {
        let code = CurrencyCode::try_from("EUR").unwrap();
        assert_eq!(code.code(), "EUR");
        let lower = CurrencyCode::try_from("eur").unwrap();
        assert_eq!(lower.to_string(), "eur");
    }

    #[test]
    fn empty_is_missing_not_invalid() {
        assert!(matches!(
            CurrencyCode::try_from(""),
            Err(EngineError::MissingCurrency)
        ));
    }

    #[test]
    fn wrong_length_is_invalid() {
        for input in ["EU", "EURO", "E", "EUROS"] {
            assert!(matches!(
                CurrencyCode::try_from(input),
                Err(EngineError::InvalidCurrency(ref code)) if code == input
            ));
        }
    }
}
