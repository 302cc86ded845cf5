//! The fixed feature schema shared with the downstream classifier.
//!
//! The classifier was trained on a 30-column row in exactly the order of
//! [`FeatureName::ALL`]. That order is a contract: reordering or renaming a
//! column silently corrupts predictions, so callers holding the classifier's
//! column list should check it with [`validate_columns`] at startup.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Number of features in a vector.
pub const FEATURE_COUNT: usize = 30;

/// One column of the feature row. Declaration order is the column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureName {
    UsingIp,
    LongUrl,
    ShortUrl,
    SymbolAt,
    DoubleSlashRedirect,
    PrefixSuffix,
    SubDomains,
    Https,
    DomainRegLen,
    Favicon,
    NonStdPort,
    HttpsDomainUrl,
    RequestUrl,
    AnchorUrl,
    LinksInScriptTags,
    ServerFormHandler,
    InfoEmail,
    AbnormalUrl,
    WebsiteForwarding,
    StatusBarCust,
    DisableRightClick,
    UsingPopupWindow,
    IframeRedirection,
    AgeOfDomain,
    DnsRecording,
    WebsiteTraffic,
    PageRank,
    GoogleIndex,
    LinksPointingToPage,
    StatsReport,
}

impl FeatureName {
    /// Every feature in column order.
    pub const ALL: [FeatureName; FEATURE_COUNT] = [
        FeatureName::UsingIp,
        FeatureName::LongUrl,
        FeatureName::ShortUrl,
        FeatureName::SymbolAt,
        FeatureName::DoubleSlashRedirect,
        FeatureName::PrefixSuffix,
        FeatureName::SubDomains,
        FeatureName::Https,
        FeatureName::DomainRegLen,
        FeatureName::Favicon,
        FeatureName::NonStdPort,
        FeatureName::HttpsDomainUrl,
        FeatureName::RequestUrl,
        FeatureName::AnchorUrl,
        FeatureName::LinksInScriptTags,
        FeatureName::ServerFormHandler,
        FeatureName::InfoEmail,
        FeatureName::AbnormalUrl,
        FeatureName::WebsiteForwarding,
        FeatureName::StatusBarCust,
        FeatureName::DisableRightClick,
        FeatureName::UsingPopupWindow,
        FeatureName::IframeRedirection,
        FeatureName::AgeOfDomain,
        FeatureName::DnsRecording,
        FeatureName::WebsiteTraffic,
        FeatureName::PageRank,
        FeatureName::GoogleIndex,
        FeatureName::LinksPointingToPage,
        FeatureName::StatsReport,
    ];

    /// Features computed from fetched markup. A failed fetch forces all of
    /// them to suspicious.
    pub const CONTENT: [FeatureName; 11] = [
        FeatureName::Favicon,
        FeatureName::RequestUrl,
        FeatureName::AnchorUrl,
        FeatureName::LinksInScriptTags,
        FeatureName::ServerFormHandler,
        FeatureName::InfoEmail,
        FeatureName::WebsiteForwarding,
        FeatureName::StatusBarCust,
        FeatureName::DisableRightClick,
        FeatureName::UsingPopupWindow,
        FeatureName::IframeRedirection,
    ];

    /// Features approximated from domain age instead of measured.
    pub const AGE_DERIVED: [FeatureName; 3] = [
        FeatureName::WebsiteTraffic,
        FeatureName::GoogleIndex,
        FeatureName::LinksPointingToPage,
    ];

    /// Column position in the classifier row.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The classifier's column name.
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureName::UsingIp => "UsingIP",
            FeatureName::LongUrl => "LongURL",
            FeatureName::ShortUrl => "ShortURL",
            FeatureName::SymbolAt => "Symbol@",
            FeatureName::DoubleSlashRedirect => "Redirecting//",
            FeatureName::PrefixSuffix => "PrefixSuffix-",
            FeatureName::SubDomains => "SubDomains",
            FeatureName::Https => "HTTPS",
            FeatureName::DomainRegLen => "DomainRegLen",
            FeatureName::Favicon => "Favicon",
            FeatureName::NonStdPort => "NonStdPort",
            FeatureName::HttpsDomainUrl => "HTTPSDomainURL",
            FeatureName::RequestUrl => "RequestURL",
            FeatureName::AnchorUrl => "AnchorURL",
            FeatureName::LinksInScriptTags => "LinksInScriptTags",
            FeatureName::ServerFormHandler => "ServerFormHandler",
            FeatureName::InfoEmail => "InfoEmail",
            FeatureName::AbnormalUrl => "AbnormalURL",
            FeatureName::WebsiteForwarding => "WebsiteForwarding",
            FeatureName::StatusBarCust => "StatusBarCust",
            FeatureName::DisableRightClick => "DisableRightClick",
            FeatureName::UsingPopupWindow => "UsingPopupWindow",
            FeatureName::IframeRedirection => "IframeRedirection",
            FeatureName::AgeOfDomain => "AgeofDomain",
            FeatureName::DnsRecording => "DNSRecording",
            FeatureName::WebsiteTraffic => "WebsiteTraffic",
            FeatureName::PageRank => "PageRank",
            FeatureName::GoogleIndex => "GoogleIndex",
            FeatureName::LinksPointingToPage => "LinksPointingToPage",
            FeatureName::StatsReport => "StatsReport",
        }
    }

    /// Whether this feature belongs to the content block.
    pub fn is_content(self) -> bool {
        FeatureName::CONTENT.contains(&self)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownFeature(s.to_string()))
    }
}

impl Serialize for FeatureName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Ternary feature value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i8)]
pub enum FeatureValue {
    Suspicious = -1,
    Neutral = 0,
    /// Every feature starts here until a rule says otherwise.
    #[default]
    Legitimate = 1,
}

impl FeatureValue {
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

impl TryFrom<i8> for FeatureValue {
    type Error = SchemaError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(FeatureValue::Suspicious),
            0 => Ok(FeatureValue::Neutral),
            1 => Ok(FeatureValue::Legitimate),
            other => Err(SchemaError::InvalidValue(other)),
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

/// Schema contract violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("expected {expected} columns, classifier declares {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("column {position}: expected `{expected}`, classifier declares `{found}`")]
    ColumnMismatch {
        position: usize,
        expected: &'static str,
        found: String,
    },

    #[error("unknown feature name `{0}`")]
    UnknownFeature(String),

    #[error("feature value {0} is outside {{-1, 0, 1}}")]
    InvalidValue(i8),
}

/// Check a classifier's declared column list against the schema.
///
/// Reports the first difference. A mismatch is fatal: the caller should
/// refuse to produce rows for that classifier.
pub fn validate_columns<S: AsRef<str>>(columns: &[S]) -> Result<(), SchemaError> {
    if columns.len() != FEATURE_COUNT {
        return Err(SchemaError::LengthMismatch {
            expected: FEATURE_COUNT,
            found: columns.len(),
        });
    }

    for (position, (expected, found)) in FeatureName::ALL.iter().zip(columns).enumerate() {
        if expected.as_str() != found.as_ref() {
            return Err(SchemaError::ColumnMismatch {
                position,
                expected: expected.as_str(),
                found: found.as_ref().to_string(),
            });
        }
    }

    Ok(())
}

/// The column names in order.
pub fn column_names() -> [&'static str; FEATURE_COUNT] {
    FeatureName::ALL.map(FeatureName::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_position() {
        for (i, name) in FeatureName::ALL.iter().enumerate() {
            assert_eq!(name.index(), i, "{name} is out of place");
        }
    }

    #[test]
    fn test_column_order_contract() {
        let cols = column_names();
        assert_eq!(cols[0], "UsingIP");
        assert_eq!(cols[3], "Symbol@");
        assert_eq!(cols[4], "Redirecting//");
        assert_eq!(cols[14], "LinksInScriptTags");
        assert_eq!(cols[23], "AgeofDomain");
        assert_eq!(cols[29], "StatsReport");
        assert!(validate_columns(&cols).is_ok());
    }

    #[test]
    fn test_round_trip_names() {
        for name in FeatureName::ALL {
            assert_eq!(name.as_str().parse::<FeatureName>().unwrap(), name);
        }
        assert!("Nope".parse::<FeatureName>().is_err());
    }

    #[test]
    fn test_validate_columns_length() {
        let err = validate_columns(&["UsingIP"]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::LengthMismatch {
                expected: 30,
                found: 1
            }
        );
    }

    #[test]
    fn test_validate_columns_swapped() {
        let mut cols = column_names().to_vec();
        cols.swap(1, 2);
        match validate_columns(&cols).unwrap_err() {
            SchemaError::ColumnMismatch {
                position,
                expected,
                found,
            } => {
                assert_eq!(position, 1);
                assert_eq!(expected, "LongURL");
                assert_eq!(found, "ShortURL");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(FeatureValue::try_from(-1).unwrap(), FeatureValue::Suspicious);
        assert_eq!(FeatureValue::try_from(0).unwrap(), FeatureValue::Neutral);
        assert_eq!(FeatureValue::try_from(1).unwrap(), FeatureValue::Legitimate);
        assert_eq!(
            FeatureValue::try_from(2).unwrap_err(),
            SchemaError::InvalidValue(2)
        );
        assert_eq!(FeatureValue::default(), FeatureValue::Legitimate);
    }

    #[test]
    fn test_content_block() {
        assert!(FeatureName::Favicon.is_content());
        assert!(FeatureName::LinksInScriptTags.is_content());
        assert!(!FeatureName::AgeOfDomain.is_content());
        assert!(!FeatureName::UsingIp.is_content());
    }
}
