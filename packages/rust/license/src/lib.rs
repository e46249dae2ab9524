//! License classification and allowlist gating.
//!
//! Maps free-text license metadata to a canonical [`LicenseTag`] and decides
//! allow/deny against a configurable [`Allowlist`]. Classification is a pure
//! substring match with no failure modes: unrecognized text yields
//! [`LicenseTag::Unknown`], which is a violation unless explicitly allowed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use courseforge_shared::LicenseTag;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify free-text license metadata into a canonical tag.
///
/// Matches are case-insensitive and checked in priority order so that more
/// specific license strings win over their substrings (CC-BY-SA before CC-BY,
/// Public-Domain and CC0 before both).
pub fn classify(text: &str) -> LicenseTag {
    let t = text.to_lowercase();

    if t.contains("public domain") || t.contains("public-domain") {
        return LicenseTag::PublicDomain;
    }
    if t.contains("cc0") {
        return LicenseTag::Cc0;
    }
    if t.contains("cc by-sa") || t.contains("cc-by-sa") || t.contains("cc by sa") {
        return LicenseTag::CcBySa;
    }
    if t.contains("cc by") || t.contains("cc-by") {
        return LicenseTag::CcBy;
    }

    LicenseTag::Unknown
}

/// Canonical Creative Commons deed URL for a tag, used in attribution lines.
pub fn license_url(tag: LicenseTag) -> &'static str {
    match tag {
        LicenseTag::CcBy => "https://creativecommons.org/licenses/by/4.0/",
        LicenseTag::CcBySa => "https://creativecommons.org/licenses/by-sa/4.0/",
        LicenseTag::Cc0 => "https://creativecommons.org/publicdomain/zero/1.0/",
        LicenseTag::PublicDomain => "https://creativecommons.org/publicdomain/mark/1.0/",
        LicenseTag::Unknown => "https://creativecommons.org/licenses/",
    }
}

// ---------------------------------------------------------------------------
// Allowlist
// ---------------------------------------------------------------------------

/// The set of license tags a course run accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowlist {
    tags: BTreeSet<LicenseTag>,
}

impl Allowlist {
    /// Parse a comma-separated allowlist string (e.g. `"CC-BY,CC0"`).
    /// Unrecognized entries are skipped; an empty result falls back to the
    /// default allowlist so a malformed flag never locks out every source.
    pub fn parse(s: &str) -> Self {
        let tags: BTreeSet<LicenseTag> = s
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }
                match part.parse::<LicenseTag>() {
                    Ok(tag) => Some(tag),
                    Err(_) => {
                        tracing::warn!(entry = part, "skipping unrecognized allowlist entry");
                        None
                    }
                }
            })
            .collect();

        if tags.is_empty() {
            Self::default()
        } else {
            Self { tags }
        }
    }

    /// Whether the allowlist accepts the given tag.
    pub fn allows(&self, tag: LicenseTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Sorted canonical tag strings, as written into the manifest.
    pub fn sorted_tags(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl Default for Allowlist {
    /// All four known open licenses; `Unknown` is never allowed by default.
    fn default() -> Self {
        Self {
            tags: [
                LicenseTag::CcBy,
                LicenseTag::CcBySa,
                LicenseTag::Cc0,
                LicenseTag::PublicDomain,
            ]
            .into_iter()
            .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

/// Outcome of an allowlist check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LicenseStatus {
    Ok,
    Violation,
}

/// Result of classifying and gating a license string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseCheck {
    /// The classified tag.
    pub tag: LicenseTag,
    /// `Ok` iff the tag is a member of the allowlist.
    pub status: LicenseStatus,
}

/// Classify `text` and gate the result against `allowlist`.
pub fn check(text: &str, allowlist: &Allowlist) -> LicenseCheck {
    let tag = classify(text);
    let status = if allowlist.allows(tag) {
        LicenseStatus::Ok
    } else {
        LicenseStatus::Violation
    };
    LicenseCheck { tag, status }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_priority_order() {
        // Highest-priority match wins regardless of token order.
        assert_eq!(
            classify("released as public domain, also cc-by"),
            LicenseTag::PublicDomain
        );
        assert_eq!(
            classify("cc-by text ... public domain dedication"),
            LicenseTag::PublicDomain
        );
        assert_eq!(classify("CC0 1.0 Universal"), LicenseTag::Cc0);
        assert_eq!(classify("licensed CC BY-SA 4.0"), LicenseTag::CcBySa);
        assert_eq!(classify("Licensed under CC BY 4.0"), LicenseTag::CcBy);
        assert_eq!(classify("all rights reserved"), LicenseTag::Unknown);
    }

    #[test]
    fn classify_sa_before_by() {
        // CC-BY-SA contains "cc by" as a substring; the more specific tag
        // must be checked first.
        assert_eq!(classify("cc by sa"), LicenseTag::CcBySa);
        assert_eq!(classify("CC-BY-SA"), LicenseTag::CcBySa);
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(classify("PUBLIC DOMAIN"), LicenseTag::PublicDomain);
        assert_eq!(classify("Cc By-Sa"), LicenseTag::CcBySa);
    }

    #[test]
    fn check_gates_against_allowlist() {
        let allow = Allowlist::parse("CC-BY-SA");
        let ok = check("Wikipedia article CC BY-SA", &allow);
        assert_eq!(ok.tag, LicenseTag::CcBySa);
        assert_eq!(ok.status, LicenseStatus::Ok);

        let bad = check("Licensed CC BY 4.0", &allow);
        assert_eq!(bad.tag, LicenseTag::CcBy);
        assert_eq!(bad.status, LicenseStatus::Violation);
    }

    #[test]
    fn unknown_is_violation_unless_listed() {
        let default = Allowlist::default();
        let result = check("no license info", &default);
        assert_eq!(result.status, LicenseStatus::Violation);

        let permissive = Allowlist::parse("CC-BY,Unknown");
        let result = check("no license info", &permissive);
        assert_eq!(result.status, LicenseStatus::Ok);
    }

    #[test]
    fn allowlist_parse_skips_garbage() {
        let allow = Allowlist::parse("CC-BY, bogus, CC0");
        assert!(allow.allows(LicenseTag::CcBy));
        assert!(allow.allows(LicenseTag::Cc0));
        assert!(!allow.allows(LicenseTag::CcBySa));
    }

    #[test]
    fn allowlist_empty_falls_back_to_default() {
        let allow = Allowlist::parse("");
        assert!(allow.allows(LicenseTag::PublicDomain));
        assert!(!allow.allows(LicenseTag::Unknown));
    }

    #[test]
    fn sorted_tags_are_canonical_and_ordered() {
        let allow = Allowlist::parse("Public-Domain,CC-BY");
        assert_eq!(allow.sorted_tags(), vec!["CC-BY", "Public-Domain"]);
    }
}
