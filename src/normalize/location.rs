//! Location string parsing.
//!
//! ATS location strings are free-form ("San Francisco, CA, United States",
//! "Remote - EMEA", "Berlin · Germany"). We split on the common separators,
//! resolve the rightmost token against a country table, and classify remote
//! and hybrid cues.

use crate::domain::models::WorkType;

/// Parsed components of a raw location string.
#[derive(Debug, Clone, Default)]
pub struct ParsedLocation {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub work_type: WorkType,
}

const REMOTE_CUES: &[&str] = &["remote", "anywhere", "wfh", "work from home", "distributed"];

/// (synonym, canonical country name). Lowercase keys.
const COUNTRIES: &[(&str, &str)] = &[
    ("united states", "United States"),
    ("usa", "United States"),
    ("us", "United States"),
    ("u.s.", "United States"),
    ("united states of america", "United States"),
    ("united kingdom", "United Kingdom"),
    ("uk", "United Kingdom"),
    ("england", "United Kingdom"),
    ("canada", "Canada"),
    ("germany", "Germany"),
    ("deutschland", "Germany"),
    ("france", "France"),
    ("netherlands", "Netherlands"),
    ("the netherlands", "Netherlands"),
    ("spain", "Spain"),
    ("portugal", "Portugal"),
    ("italy", "Italy"),
    ("ireland", "Ireland"),
    ("sweden", "Sweden"),
    ("norway", "Norway"),
    ("denmark", "Denmark"),
    ("finland", "Finland"),
    ("poland", "Poland"),
    ("switzerland", "Switzerland"),
    ("austria", "Austria"),
    ("belgium", "Belgium"),
    ("czech republic", "Czechia"),
    ("czechia", "Czechia"),
    ("estonia", "Estonia"),
    ("australia", "Australia"),
    ("new zealand", "New Zealand"),
    ("india", "India"),
    ("singapore", "Singapore"),
    ("japan", "Japan"),
    ("south korea", "South Korea"),
    ("israel", "Israel"),
    ("brazil", "Brazil"),
    ("mexico", "Mexico"),
    ("argentina", "Argentina"),
    ("colombia", "Colombia"),
    ("chile", "Chile"),
    ("nigeria", "Nigeria"),
    ("south africa", "South Africa"),
    ("united arab emirates", "United Arab Emirates"),
    ("uae", "United Arab Emirates"),
];

/// US state postal codes and names; a rightmost match implies country = US.
const US_STATES: &[&str] = &[
    "al", "ak", "az", "ar", "ca", "co", "ct", "de", "fl", "ga", "hi", "id", "il", "in", "ia",
    "ks", "ky", "la", "me", "md", "ma", "mi", "mn", "ms", "mo", "mt", "ne", "nv", "nh", "nj",
    "nm", "ny", "nc", "nd", "oh", "ok", "or", "pa", "ri", "sc", "sd", "tn", "tx", "ut", "vt",
    "va", "wa", "wv", "wi", "wy", "dc", "california", "new york", "texas", "washington",
    "massachusetts", "colorado", "illinois", "georgia", "florida", "oregon", "virginia",
];

fn lookup_country(token: &str) -> Option<&'static str> {
    let key = token.trim().to_lowercase();
    COUNTRIES
        .iter()
        .find(|(syn, _)| *syn == key)
        .map(|(_, canonical)| *canonical)
}

fn is_us_state(token: &str) -> bool {
    let key = token.trim().to_lowercase();
    US_STATES.contains(&key.as_str())
}

fn is_remote_cue(token: &str) -> bool {
    let key = token.trim().to_lowercase();
    REMOTE_CUES.iter().any(|cue| key == *cue || key.starts_with(&format!("{} ", cue)))
}

/// Parse a raw location string into city/region/country and work type.
///
/// Remote cues force `work_type = remote` and clear city/region (country is
/// still resolved when present, e.g. "Remote, United States"). A hybrid cue
/// keeps the location but sets `work_type = hybrid`.
pub fn parse_location(raw: &str) -> ParsedLocation {
    let mut parsed = ParsedLocation::default();
    let lowered = raw.to_lowercase();

    if lowered.contains("hybrid") {
        parsed.work_type = WorkType::Hybrid;
    }
    let is_remote = REMOTE_CUES.iter().any(|cue| lowered.contains(cue))
        && parsed.work_type != WorkType::Hybrid;
    if is_remote {
        parsed.work_type = WorkType::Remote;
    }

    // Split on the separators ATSes actually use, drop cue-only tokens
    let mut tokens: Vec<String> = raw
        .split(|c: char| matches!(c, ',' | '–' | '—' | '|' | '·' | '/'))
        .map(|t| t.trim().trim_matches('-').trim())
        .filter(|t| !t.is_empty())
        .filter(|t| !is_remote_cue(t) && !t.eq_ignore_ascii_case("hybrid"))
        .map(|t| t.to_string())
        .collect();

    if let Some(last) = tokens.last().cloned() {
        if let Some(country) = lookup_country(&last) {
            parsed.country = Some(country.to_string());
            tokens.pop();
        } else if is_us_state(&last) {
            parsed.country = Some("United States".to_string());
        }
    }

    if !is_remote {
        match tokens.len() {
            0 => {}
            1 => parsed.city = Some(tokens[0].clone()),
            _ => {
                parsed.city = Some(tokens[0].clone());
                parsed.region = Some(tokens[tokens.len() - 1].clone());
            }
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_region_country() {
        let p = parse_location("San Francisco, CA, United States");
        assert_eq!(p.city.as_deref(), Some("San Francisco"));
        assert_eq!(p.region.as_deref(), Some("CA"));
        assert_eq!(p.country.as_deref(), Some("United States"));
        assert_eq!(p.work_type, WorkType::Onsite);
    }

    #[test]
    fn test_city_country() {
        let p = parse_location("Berlin, Germany");
        assert_eq!(p.city.as_deref(), Some("Berlin"));
        assert!(p.region.is_none());
        assert_eq!(p.country.as_deref(), Some("Germany"));
    }

    #[test]
    fn test_us_state_implies_country() {
        let p = parse_location("Austin, TX");
        assert_eq!(p.city.as_deref(), Some("Austin"));
        assert_eq!(p.region.as_deref(), Some("TX"));
        assert_eq!(p.country.as_deref(), Some("United States"));
    }

    #[test]
    fn test_bare_city() {
        let p = parse_location("London");
        assert_eq!(p.city.as_deref(), Some("London"));
        assert!(p.region.is_none());
        assert!(p.country.is_none());
    }

    #[test]
    fn test_remote_clears_city_and_region() {
        let p = parse_location("Remote");
        assert_eq!(p.work_type, WorkType::Remote);
        assert!(p.city.is_none());
        assert!(p.region.is_none());

        let p = parse_location("Remote, United States");
        assert_eq!(p.work_type, WorkType::Remote);
        assert!(p.city.is_none());
        assert_eq!(p.country.as_deref(), Some("United States"));
    }

    #[test]
    fn test_wfh_cue() {
        let p = parse_location("WFH - anywhere");
        assert_eq!(p.work_type, WorkType::Remote);
    }

    #[test]
    fn test_hybrid_keeps_location() {
        let p = parse_location("Hybrid, Amsterdam, Netherlands");
        assert_eq!(p.work_type, WorkType::Hybrid);
        assert_eq!(p.city.as_deref(), Some("Amsterdam"));
        assert_eq!(p.country.as_deref(), Some("Netherlands"));
    }

    #[test]
    fn test_en_dash_and_pipe_separators() {
        let p = parse_location("Toronto – Canada");
        assert_eq!(p.city.as_deref(), Some("Toronto"));
        assert_eq!(p.country.as_deref(), Some("Canada"));

        let p = parse_location("Paris | France");
        assert_eq!(p.city.as_deref(), Some("Paris"));
        assert_eq!(p.country.as_deref(), Some("France"));
    }

    #[test]
    fn test_empty_string() {
        let p = parse_location("");
        assert!(p.city.is_none());
        assert!(p.country.is_none());
        assert_eq!(p.work_type, WorkType::Onsite);
    }
}
