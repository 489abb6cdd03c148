//! Relevance scoring between a free-text request and an evidence item
//!
//! Requests are reduced to a keyword set ([`RequestTerms`]); a
//! [`RelevanceScorer`] compares that set against an item's tags, category and
//! source. Two strategies ship:
//! - [`TagOverlapScorer`]: plain keyword overlap (default)
//! - [`ThesaurusScorer`]: overlap after expanding keywords through a
//!   security-term thesaurus; expansions count half

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Debug;
use ttx_scenario::EvidenceItem;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("token pattern compiles"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "with", "from", "that", "this", "what", "which", "were", "was",
        "are", "any", "all", "our", "there", "their", "into", "about", "have", "has", "had",
        "can", "please", "let", "check", "look", "show", "see", "find", "review", "examine",
        "investigate", "analyze", "analyse", "pull", "get", "give", "tell", "who", "how", "why",
        "when", "where", "did", "does", "happened", "anything", "something", "related",
    ]
    .into_iter()
    .collect()
});

/// Lower-case, split on non-alphanumerics, drop short and stop words, fold plurals
fn keywords(text: &str) -> impl Iterator<Item = String> + '_ {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect::<Vec<_>>()
        .into_iter()
        .filter(|t| t.len() >= 3 && !STOP_WORDS.contains(t.as_str()))
        .map(|t| fold_plural(&t))
}

fn fold_plural(token: &str) -> String {
    if token.len() > 4 {
        if let Some(stem) = token.strip_suffix("ies") {
            return format!("{stem}y");
        }
    }
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

/// Keyword set extracted from a player request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTerms {
    raw: String,
    keywords: BTreeSet<String>,
}

impl RequestTerms {
    /// Extract keywords from request text
    #[must_use]
    pub fn parse(request: &str) -> Self {
        Self {
            raw: request.to_string(),
            keywords: keywords(request).collect(),
        }
    }

    /// Original request text
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized keywords
    #[inline]
    #[must_use]
    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    /// No usable keywords
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Terms an item can be matched on
#[must_use]
pub fn item_terms(item: &EvidenceItem) -> BTreeSet<String> {
    let mut terms: BTreeSet<String> = item.tags.iter().flat_map(|t| keywords(t)).collect();
    terms.extend(keywords(&item.category));
    if let Some(source) = &item.source {
        terms.extend(keywords(source));
    }
    terms
}

/// Strategy for scoring request/evidence relevance
///
/// Implementations must be deterministic: the same request and item always
/// produce the same score.
pub trait RelevanceScorer: Send + Sync + Debug {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Non-negative relevance score
    fn score(&self, request: &RequestTerms, item: &EvidenceItem) -> f64;
}

/// Bag-of-tags overlap count
#[derive(Debug, Clone, Copy, Default)]
pub struct TagOverlapScorer;

impl RelevanceScorer for TagOverlapScorer {
    fn name(&self) -> &'static str {
        "tag-overlap"
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(&self, request: &RequestTerms, item: &EvidenceItem) -> f64 {
        let terms = item_terms(item);
        request.keywords().intersection(&terms).count() as f64
    }
}

/// Overlap after thesaurus expansion
///
/// A keyword found directly scores 1; a keyword that only matches through one
/// of its related terms scores 0.5. The built-in table covers common
/// incident-response vocabulary; [`ThesaurusScorer::with_entry`] adds more
/// (for example entries generated offline by a language model).
#[derive(Debug, Clone)]
pub struct ThesaurusScorer {
    entries: BTreeMap<String, BTreeSet<String>>,
}

const BUILTIN_THESAURUS: &[(&str, &[&str])] = &[
    ("email", &["phishing", "attachment", "mailbox", "spam", "message", "lure"]),
    ("mail", &["phishing", "attachment", "mailbox", "spam", "message"]),
    ("phish", &["phishing", "attachment", "lure", "email"]),
    ("login", &["authentication", "credential", "account", "logon", "vpn"]),
    ("logon", &["authentication", "credential", "account", "login"]),
    ("password", &["credential", "lsass", "dump", "account"]),
    ("credential", &["lsass", "dump", "password", "account", "login"]),
    ("user", &["account", "login", "credential", "mailbox"]),
    ("log", &["event", "authentication", "login", "firewall", "proxy"]),
    ("network", &["dns", "proxy", "firewall", "smb", "traffic", "port"]),
    ("traffic", &["network", "firewall", "dns", "proxy", "upload"]),
    ("firewall", &["network", "port", "scan", "traffic"]),
    ("malware", &["beacon", "macro", "process", "loader", "download"]),
    ("process", &["endpoint", "service", "macro", "beacon"]),
    ("persistence", &["scheduled", "task", "registry", "autorun", "service"]),
    ("startup", &["autorun", "logon", "scheduled", "registry"]),
    ("lateral", &["smb", "share", "admin", "psexec", "rdp"]),
    ("movement", &["lateral", "smb", "share", "psexec"]),
    ("server", &["share", "smb", "service", "admin"]),
    ("exfiltration", &["upload", "cloud", "archive", "staging", "transfer"]),
    ("exfil", &["upload", "cloud", "archive", "staging", "transfer"]),
    ("data", &["archive", "staging", "upload", "payroll"]),
    ("file", &["archive", "staging", "share", "download"]),
    ("upload", &["cloud", "exfiltration", "storage", "transfer"]),
    ("dns", &["domain", "network", "proxy"]),
    ("web", &["proxy", "download", "domain"]),
];

impl ThesaurusScorer {
    /// Scorer preloaded with the built-in table
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN_THESAURUS
            .iter()
            .fold(Self::empty(), |scorer, (term, related)| {
                scorer.with_entry(term, related.iter().copied())
            })
    }

    /// Scorer with no entries (behaves like tag overlap)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add related terms for a keyword
    #[must_use]
    pub fn with_entry<'a>(mut self, term: &str, related: impl IntoIterator<Item = &'a str>) -> Self {
        let key = fold_plural(&term.to_lowercase());
        self.entries
            .entry(key)
            .or_default()
            .extend(related.into_iter().flat_map(keywords));
        self
    }

    /// Related terms for a keyword
    #[must_use]
    pub fn related(&self, keyword: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(keyword)
    }
}

impl Default for ThesaurusScorer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RelevanceScorer for ThesaurusScorer {
    fn name(&self) -> &'static str {
        "thesaurus"
    }

    fn score(&self, request: &RequestTerms, item: &EvidenceItem) -> f64 {
        let terms = item_terms(item);
        request
            .keywords()
            .iter()
            .map(|keyword| {
                if terms.contains(keyword) {
                    1.0
                } else if self
                    .related(keyword)
                    .is_some_and(|related| !related.is_disjoint(&terms))
                {
                    0.5
                } else {
                    0.0
                }
            })
            .sum()
    }
}
