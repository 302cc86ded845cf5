//! Structural and script signals from fetched markup.
//!
//! Script behaviours are sniffed with regexes over the raw text. That is
//! best effort: obfuscated scripts slip through, and a miss leaves the
//! feature at its default.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::fetch::{FetchResult, FetchedPage};
use crate::schema::{FeatureName, FeatureValue};
use crate::target::Target;
use crate::vector::FeatureVector;

static MAILTO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"mailto:").unwrap());

static STATUS_BAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)onmouseover\s*=\s*['"]window\.status"#).unwrap());

static RIGHT_CLICK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"event\.button\s*==\s*2").unwrap());

static POPUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"window\.open\(").unwrap());

/// External share of embedded resources above which the page is suspicious.
const RESOURCE_RATIO: f64 = 0.61;
/// External share of anchors above which the page is suspicious.
const ANCHOR_RATIO: f64 = 0.67;

/// Form actions that submit nowhere.
const BLANK_ACTIONS: &[&str] = &["", "#", "javascript:void(0)", "javascript:void(0);", "about:blank"];

/// Internal/external counts for one kind of reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub external: usize,
}

impl Tally {
    fn count(&mut self, external: bool) {
        self.total += 1;
        if external {
            self.external += 1;
        }
    }

    /// External share, or `None` when nothing was counted.
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| self.external as f64 / self.total as f64)
    }
}

/// Where the first decisive form submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormHandler {
    /// No form, or every form posts back to the page's own host.
    SameHost,
    /// Posts to another host.
    CrossHost,
    /// Empty, `#`, or a no-op script.
    Blank,
}

/// Everything the analyzer observed on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSignals {
    pub external_favicon: bool,
    pub resources: Tally,
    pub anchors: Tally,
    /// Script sources, also counted in `resources`.
    pub script_links: Tally,
    pub form_handler: FormHandler,
    pub has_mailto: bool,
    pub redirects: usize,
    pub status_bar_spoof: bool,
    pub disables_right_click: bool,
    pub opens_popup: bool,
    pub has_iframe: bool,
}

/// Inspect a fetched page. References are resolved against `target`.
pub fn analyze(page: &FetchedPage, target: &Target) -> MarkupSignals {
    let raw = page.body.as_str();
    let document = Html::parse_document(raw);

    let mut resources = Tally::default();
    let mut script_links = Tally::default();
    if let Ok(sel) = Selector::parse("img[src], video[src], audio[src], script[src]") {
        for el in document.select(&sel) {
            if let Some(src) = el.value().attr("src") {
                let external = target.is_external(src);
                resources.count(external);
                if el.value().name() == "script" {
                    script_links.count(external);
                }
            }
        }
    }

    let mut anchors = Tally::default();
    if let Ok(sel) = Selector::parse("a[href]") {
        for el in document.select(&sel) {
            if let Some(href) = el.value().attr("href") {
                anchors.count(target.is_external(href));
            }
        }
    }

    let has_iframe = Selector::parse("iframe")
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false);

    MarkupSignals {
        external_favicon: external_favicon(&document, target),
        resources,
        anchors,
        script_links,
        form_handler: form_handler(&document, target),
        has_mailto: MAILTO_RE.is_match(raw),
        redirects: page.redirects,
        status_bar_spoof: STATUS_BAR_RE.is_match(raw),
        disables_right_click: RIGHT_CLICK_RE.is_match(raw),
        opens_popup: POPUP_RE.is_match(raw),
        has_iframe,
    }
}

/// First icon link only; one without `href` says nothing.
fn external_favicon(document: &Html, target: &Target) -> bool {
    let Ok(sel) = Selector::parse("link[rel]") else {
        return false;
    };
    document
        .select(&sel)
        .find(|el| {
            el.value()
                .attr("rel")
                .is_some_and(|rel| rel.to_ascii_lowercase().contains("icon"))
        })
        .and_then(|el| el.value().attr("href"))
        .is_some_and(|href| target.is_external(href))
}

/// The first blank or cross-host form decides.
fn form_handler(document: &Html, target: &Target) -> FormHandler {
    let Ok(sel) = Selector::parse("form") else {
        return FormHandler::SameHost;
    };
    for form in document.select(&sel) {
        let action = form.value().attr("action").unwrap_or("").trim();
        if BLANK_ACTIONS.iter().any(|blank| action.eq_ignore_ascii_case(blank)) {
            return FormHandler::Blank;
        }
        if target.is_external(action) {
            return FormHandler::CrossHost;
        }
    }
    FormHandler::SameHost
}

/// Turn signals into feature values.
pub fn score(signals: &MarkupSignals, vector: &mut FeatureVector) {
    if signals.external_favicon {
        vector.flag(FeatureName::Favicon);
    }
    if signals.resources.ratio().is_some_and(|r| r > RESOURCE_RATIO) {
        vector.flag(FeatureName::RequestUrl);
    }
    if signals.anchors.ratio().is_some_and(|r| r > ANCHOR_RATIO) {
        vector.flag(FeatureName::AnchorUrl);
    }
    // LinksInScriptTags has no threshold of its own; script sources only
    // count toward RequestURL.
    match signals.form_handler {
        FormHandler::Blank => vector.flag(FeatureName::ServerFormHandler),
        FormHandler::CrossHost => {
            vector.set(FeatureName::ServerFormHandler, FeatureValue::Neutral)
        }
        FormHandler::SameHost => {}
    }
    if signals.has_mailto {
        vector.flag(FeatureName::InfoEmail);
    }
    if signals.redirects > 1 {
        vector.flag(FeatureName::WebsiteForwarding);
    }
    if signals.status_bar_spoof {
        vector.flag(FeatureName::StatusBarCust);
    }
    if signals.disables_right_click {
        vector.flag(FeatureName::DisableRightClick);
    }
    if signals.opens_popup {
        vector.flag(FeatureName::UsingPopupWindow);
    }
    if signals.has_iframe {
        vector.flag(FeatureName::IframeRedirection);
    }
}

/// Apply the content block for a fetch outcome.
///
/// Without markup the content signals are unknowable, and unknowable counts
/// as suspicious.
pub fn apply(fetched: &FetchResult, target: &Target, vector: &mut FeatureVector) {
    match fetched {
        FetchResult::Fetched(page) => score(&analyze(page, target), vector),
        FetchResult::Failed(_) => {
            for name in FeatureName::CONTENT {
                vector.flag(name);
            }
        }
    }
}
