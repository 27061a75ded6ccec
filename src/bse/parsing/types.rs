use serde::{Deserialize, Serialize};

/// Sentinel substituted whenever an expected metadata element is absent.
pub const UNKNOWN: &str = "Unknown";

/// Context identifier assumed for facts that carry none.
pub const DEFAULT_CONTEXT: &str = "OneD";

/// Outcome of a metadata lookup. Missing markers are the common case in
/// these filings, so absence is a value here, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Found(String),
    Missing,
}

impl Resolved {
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some(text) if !text.trim().is_empty() => Resolved::Found(text.trim().to_string()),
            _ => Resolved::Missing,
        }
    }

    pub fn found(&self) -> Option<&str> {
        match self {
            Resolved::Found(value) => Some(value),
            Resolved::Missing => None,
        }
    }

    pub fn or_unknown(&self) -> String {
        match self {
            Resolved::Found(value) => value.clone(),
            Resolved::Missing => UNKNOWN.to_string(),
        }
    }
}

/// How a fact's reporting period is resolved. Everything else about the two
/// extraction variants is shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum Dialect {
    /// Document-level period metadata broadcast to every row.
    #[strum(serialize = "broadcast")]
    Broadcast,
    /// Period looked up per fact from the context it references.
    #[strum(serialize = "per-fact")]
    PerFact,
}

/// Document-level metadata, resolved once and shared by every row of the
/// broadcast dialect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentMeta {
    pub company_code: Resolved,
    pub financial_year: Resolved,
    pub quarter: Resolved,
    pub period_start: Resolved,
    pub period_end: Resolved,
}

/// One extracted fact in the broadcast dialect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastRow {
    #[serde(rename = "Company Code")]
    pub company_code: String,
    #[serde(rename = "Financial Year")]
    pub financial_year: String,
    #[serde(rename = "Quarter")]
    pub quarter: String,
    #[serde(rename = "Element Name")]
    pub element_name: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Value")]
    pub value: Option<String>,
    #[serde(rename = "Decimal")]
    pub decimal: String,
    #[serde(rename = "Period Start Date")]
    pub period_start_date: String,
    #[serde(rename = "Period End Date")]
    pub period_end_date: String,
}

/// One extracted fact in the per-fact dialect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerFactRow {
    #[serde(rename = "Element Name")]
    pub element_name: String,
    #[serde(rename = "Fact Value")]
    pub fact_value: Option<String>,
    #[serde(rename = "Period")]
    pub period: String,
    #[serde(rename = "Decimals")]
    pub decimals: String,
    #[serde(rename = "Unit")]
    pub unit: String,
}

/// The composite join key against the taxonomy dictionary. Must be built
/// identically at extraction time and at lookup time or matches silently
/// fail.
pub fn unit_element_key(unit: &str, element_name: &str) -> String {
    format!("{}-{}", unit, element_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_from_option() {
        assert_eq!(
            Resolved::from_option(Some(" 2023-04-01 ")),
            Resolved::Found("2023-04-01".to_string())
        );
        assert_eq!(Resolved::from_option(Some("   ")), Resolved::Missing);
        assert_eq!(Resolved::from_option(None), Resolved::Missing);
        assert_eq!(Resolved::Missing.or_unknown(), UNKNOWN);
    }

    #[test]
    fn test_unit_element_key_is_order_sensitive() {
        assert_eq!(unit_element_key("OneD", "Revenue"), "OneD-Revenue");
        assert_ne!(
            unit_element_key("OneD", "Revenue"),
            unit_element_key("Revenue", "OneD")
        );
    }

    #[test]
    fn test_dialect_from_str() {
        use std::str::FromStr;
        assert_eq!(Dialect::from_str("broadcast").unwrap(), Dialect::Broadcast);
        assert_eq!(Dialect::from_str("per-fact").unwrap(), Dialect::PerFact);
        assert!(Dialect::from_str("other").is_err());
    }
}
