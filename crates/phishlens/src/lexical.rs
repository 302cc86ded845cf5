//! Features derived from the URL text alone.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{FeatureName, FeatureValue};
use crate::target::Target;
use crate::vector::FeatureVector;

/// Known link shorteners, matched as whole host labels.
static SHORTENER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z0-9-])(?:bit\.ly|bitly\.com|goo\.gl|t\.co|tinyurl\.com|ow\.ly|is\.gd|v\.gd|buff\.ly|adf\.ly|cutt\.ly|rebrand\.ly|shorte\.st|tiny\.cc|t\.ly|rb\.gy|x\.co|tr\.im|cli\.gs|po\.st|bc\.vc|qr\.net|lnkd\.in|db\.tt|s\.id|shorturl\.at)(?:[/:?#]|$)",
    )
    .unwrap()
});

/// Above this many characters the URL is suspicious.
const LONG_URL: usize = 75;
/// From this many characters up to [`LONG_URL`] the URL is neutral.
const MEDIUM_URL: usize = 54;

/// Apply every lexical rule to `vector`.
pub fn apply(target: &Target, vector: &mut FeatureVector) {
    if target.ip_literal {
        vector.flag(FeatureName::UsingIp);
    }

    let length = target.url.chars().count();
    if length > LONG_URL {
        vector.flag(FeatureName::LongUrl);
    } else if length >= MEDIUM_URL {
        vector.set(FeatureName::LongUrl, FeatureValue::Neutral);
    }

    if is_shortened(target) {
        vector.flag(FeatureName::ShortUrl);
    }

    if target.url.contains('@') {
        vector.flag(FeatureName::SymbolAt);
    }

    // The scheme's own "//" sits at index 5 or 6.
    if target.url.rfind("//").is_some_and(|pos| pos > 6) {
        vector.flag(FeatureName::DoubleSlashRedirect);
    }

    let host = target.written_host.as_str();
    if host.contains('-') {
        vector.flag(FeatureName::PrefixSuffix);
    }

    match host.matches('.').count() {
        n if n > 3 => vector.flag(FeatureName::SubDomains),
        3 => vector.set(FeatureName::SubDomains, FeatureValue::Neutral),
        _ => {}
    }

    if target.scheme != "https" {
        vector.flag(FeatureName::Https);
    }

    if target.port.is_some_and(|p| p != 80 && p != 443) {
        vector.flag(FeatureName::NonStdPort);
    }

    if host.contains("https") {
        vector.flag(FeatureName::HttpsDomainUrl);
    }
}

fn is_shortened(target: &Target) -> bool {
    SHORTENER_RE.is_match(&format!("{}{}", target.host, target.path))
}
