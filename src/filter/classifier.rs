//! Request classification.
//!
//! # Responsibilities
//! - Recognise disallowed crawlers by User-Agent fragment
//! - Decide which requests are not worth reporting
//!
//! # Design Decisions
//! - Lists are lowercased once at construction; matching never allocates
//!   for the path checks
//! - Header checks see every value of a header, lossily decoded and joined
//!   with `,`; a missing header counts as absent
//! - Paths are matched percent-decoded (see [`decode_path`])
//! - Ignore checks run in a fixed order and the first match wins

use std::borrow::Cow;

use axum::http::HeaderMap;
use percent_encoding::percent_decode_str;

/// User-Agent fragments of crawlers that get a 404 instead of the site.
pub const DEFAULT_DISALLOWED_AGENTS: &[&str] = &[
    "ClaudeBot",
    "Scrapy",
    "GoogleOther",
    "Timpibot",
    "Nutch",
    "HTTrack",
    "Dataprovider.com",
    "Bytespider",
    "Diffbot",
];

/// Static asset roots. Humans fetch these constantly and crawlers find them elsewhere.
pub const DEFAULT_IGNORED_PREFIXES: &[&str] = &["/vendor", "/js", "/scss"];

const REDIRECTED_EXTENSION: &str = ".html";
const SEC_PURPOSE: &str = "sec-purpose";
const PREFETCH: &str = "prefetch";
const AVAILABILITY_PING_MARKER: &str = "AppInsights";

/// Why a request is left out of the analytics stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `.html` paths are redirected; the rewritten request is reported instead.
    RedirectedHtml,
    /// Path under one of the ignored prefixes.
    IgnoredPrefix,
    /// `Sec-Purpose: prefetch` speculative load.
    Prefetch,
    /// Azure App Insights availability ping.
    AvailabilityPing,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::RedirectedHtml => "redirected_html",
            IgnoreReason::IgnoredPrefix => "ignored_prefix",
            IgnoreReason::Prefetch => "prefetch",
            IgnoreReason::AvailabilityPing => "availability_ping",
        }
    }
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Known disallowed crawler.
    Reject,
    /// Let through, but do not report.
    Ignore(IgnoreReason),
    /// Let through and report.
    Report,
}

impl Verdict {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Reject => "reject",
            Verdict::Ignore(reason) => reason.as_str(),
            Verdict::Report => "report",
        }
    }
}

/// Immutable deny-list and ignore-list, shared read-only by every request.
#[derive(Debug, Clone)]
pub struct Classifier {
    disallowed_agents: Vec<String>,
    ignored_prefixes: Vec<String>,
}

impl Classifier {
    /// Build a classifier from the given lists. Matching is case-insensitive.
    pub fn new<A, P>(disallowed_agents: A, ignored_prefixes: P) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            disallowed_agents: disallowed_agents
                .into_iter()
                .map(|a| a.as_ref().to_ascii_lowercase())
                .collect(),
            ignored_prefixes: ignored_prefixes
                .into_iter()
                .map(|p| p.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// True when the User-Agent contains any deny-list fragment, ignoring case.
    pub fn is_disallowed_agent(&self, user_agent: Option<&str>) -> bool {
        let Some(agent) = user_agent else {
            return false;
        };
        let agent = agent.to_ascii_lowercase();
        self.disallowed_agents
            .iter()
            .any(|fragment| agent.contains(fragment.as_str()))
    }

    /// First ignore rule matching the request, if any.
    pub fn ignore_reason(&self, path: &str, headers: &HeaderMap) -> Option<IgnoreReason> {
        if ends_with_ignore_case(path, REDIRECTED_EXTENSION) {
            return Some(IgnoreReason::RedirectedHtml);
        }

        if self
            .ignored_prefixes
            .iter()
            .any(|prefix| starts_with_ignore_case(path, prefix))
        {
            return Some(IgnoreReason::IgnoredPrefix);
        }

        if header_text(headers, SEC_PURPOSE).as_deref() == Some(PREFETCH) {
            return Some(IgnoreReason::Prefetch);
        }

        if user_agent(headers).is_some_and(|ua| ua.contains(AVAILABILITY_PING_MARKER)) {
            return Some(IgnoreReason::AvailabilityPing);
        }

        None
    }

    /// Full verdict: rejection first, then the ignore rules, then report.
    pub fn classify(&self, path: &str, headers: &HeaderMap) -> Verdict {
        if self.is_disallowed_agent(user_agent(headers).as_deref()) {
            return Verdict::Reject;
        }
        match self.ignore_reason(path, headers) {
            Some(reason) => Verdict::Ignore(reason),
            None => Verdict::Report,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_DISALLOWED_AGENTS, DEFAULT_IGNORED_PREFIXES)
    }
}

/// The User-Agent header as text, if present.
pub fn user_agent(headers: &HeaderMap) -> Option<Cow<'_, str>> {
    header_text(headers, axum::http::header::USER_AGENT.as_str())
}

/// Every value of `name`, lossily decoded and joined with `,`.
pub fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<Cow<'a, str>> {
    let mut values = headers.get_all(name).iter();
    let mut text = String::from_utf8_lossy(values.next()?.as_bytes());
    for value in values {
        let joined = text.to_mut();
        joined.push(',');
        joined.push_str(&String::from_utf8_lossy(value.as_bytes()));
    }
    Some(text)
}

/// Percent-decode a URI path once. Invalid UTF-8 is replaced, never rejected.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    percent_decode_str(path).decode_utf8_lossy()
}

fn ends_with_ignore_case(haystack: &str, suffix: &str) -> bool {
    haystack.len() >= suffix.len()
        && haystack.as_bytes()[haystack.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack.len() >= prefix.len()
        && haystack.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
