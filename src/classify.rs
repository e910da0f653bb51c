//! Heuristics to classify airports from their name and city.
//! These are not ground truth: they are cheap rules that are right for most
//! commercial airports and allowed to be wrong for edge cases.
use crate::text::normalize;
use crate::RawRecord;

static MILITARY_PATTERNS: &[&str] = &[
    "air force base",
    "afb",
    "naval air station",
    "nas",
    "joint base",
    "army airfield",
    "marine corps air station",
    "air reserve base",
    "air national guard",
    "military",
    "air base",
];

static INTERNATIONAL_KEYWORDS: &[&str] = &["international", "intl"];

static DOMESTIC_KEYWORDS: &[&str] = &[
    "regional",
    "municipal",
    "county",
    "field",
    "airfield",
    "strip",
    "local",
    "community",
    "heliport",
];

static HUB_KEYWORDS: &[&str] = &["hub", "gateway", "metropolitan"];

// normalized city names of major international hubs
static HUB_CITIES: &[&str] = &[
    "new york",
    "los angeles",
    "chicago",
    "atlanta",
    "dallas",
    "houston",
    "miami",
    "san francisco",
    "seattle",
    "boston",
    "denver",
    "toronto",
    "vancouver",
    "montreal",
    "sao paulo",
    "rio de janeiro",
    "london",
    "paris",
    "frankfurt",
    "amsterdam",
    "munich",
    "zurich",
    "istanbul",
    "dubai",
    "doha",
    "abu dhabi",
    "singapore",
    "hong kong",
    "shanghai",
    "guangzhou",
    "sydney",
    "melbourne",
    "johannesburg",
    "mumbai",
    "barcelona",
    "milan",
    "osaka",
];

// normalized city names of national capitals
static CAPITAL_CITIES: &[&str] = &[
    "washington",
    "ottawa",
    "mexico city",
    "brasilia",
    "buenos aires",
    "santiago",
    "lima",
    "bogota",
    "madrid",
    "lisbon",
    "rome",
    "berlin",
    "vienna",
    "brussels",
    "copenhagen",
    "stockholm",
    "oslo",
    "helsinki",
    "dublin",
    "warsaw",
    "prague",
    "budapest",
    "athens",
    "moscow",
    "cairo",
    "nairobi",
    "riyadh",
    "tehran",
    "new delhi",
    "delhi",
    "beijing",
    "tokyo",
    "seoul",
    "bangkok",
    "jakarta",
    "manila",
    "kuala lumpur",
    "canberra",
    "wellington",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

// whether `phrase` appears in `text` as whole words; both are normalized
fn contains_phrase(text: &str, phrase: &str) -> bool {
    format!(" {text} ").contains(&format!(" {phrase} "))
}

/// Returns whether an airport name designates a military facility
pub fn is_military_base(name: &str) -> bool {
    let name = normalize(name);
    MILITARY_PATTERNS
        .iter()
        .any(|pattern| contains_phrase(&name, pattern))
}

/// Returns whether `record` is likely an international airport.
/// The first rule that matches decides:
/// 1. name contains "international" or "intl"
/// 2. name contains a domestic keyword (regional, municipal, county, ...) => domestic
/// 3. city is a major hub
/// 4. city is a national capital
/// 5. name is longer than 35 characters
/// 6. name contains "hub", "gateway" or "metropolitan"
/// 7. otherwise domestic
pub fn is_international(record: &RawRecord) -> bool {
    let name = record.name.to_lowercase();
    if contains_any(&name, INTERNATIONAL_KEYWORDS) {
        return true;
    }
    if contains_any(&name, DOMESTIC_KEYWORDS) {
        return false;
    }
    let city = normalize(&record.city);
    if HUB_CITIES.contains(&city.as_str()) {
        return true;
    }
    if CAPITAL_CITIES.contains(&city.as_str()) {
        return true;
    }
    if record.name.chars().count() > 35 {
        return true;
    }
    contains_any(&name, HUB_KEYWORDS)
}

/// [`is_international`] of a bare place name
pub fn classify_name(name: &str) -> bool {
    is_international(&RawRecord::named(name))
}
