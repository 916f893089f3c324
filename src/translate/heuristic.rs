use super::TranslationResult;

pub const HEURISTIC_EXPLANATION: &str = "heuristic translation, no AI assistance.";

/// Product and service triggers, in the order their filters appear in the query.
const PRODUCT_RULES: &[(&str, &str)] = &[
    ("cisco", "product:cisco"),
    ("apache", "product:apache"),
    ("nginx", "product:nginx"),
    ("mikrotik", "product:mikrotik"),
    ("rdp", "port:3389"),
    ("ssh", "port:22"),
    ("ftp", "port:21"),
];

/// Country names (accented and plain spellings) to ISO 3166-1 alpha-2 codes.
const COUNTRY_RULES: &[(&str, &str)] = &[
    ("chile", "CL"),
    ("argentina", "AR"),
    ("mexico", "MX"),
    ("méxico", "MX"),
    ("españa", "ES"),
    ("peru", "PE"),
    ("perú", "PE"),
    ("colombia", "CO"),
    ("brasil", "BR"),
    ("uruguay", "UY"),
];

/// Keyword-table translation. Pure: the same question always gives the same result.
///
/// Without a matching keyword the query is the lowercased question with its
/// whitespace collapsed. A question made only of whitespace is kept as
/// lowercased, so the query is empty only for an empty question.
pub fn translate_heuristic(question: &str) -> TranslationResult {
    let q = question.to_lowercase();
    let mut parts: Vec<String> = Vec::new();

    let products = PRODUCT_RULES
        .iter()
        .filter(|(trigger, _)| q.contains(trigger))
        .map(|(_, filter)| filter.to_string());
    let countries = COUNTRY_RULES
        .iter()
        .filter(|(trigger, _)| q.contains(trigger))
        .map(|(_, code)| format!("country:{code}"));

    for fragment in products.chain(countries) {
        if !parts.contains(&fragment) {
            parts.push(fragment);
        }
    }

    let query = if !parts.is_empty() {
        parts.join(" ")
    } else {
        let normalized = q.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() { q } else { normalized }
    };

    TranslationResult {
        query,
        explanation: HEURISTIC_EXPLANATION.to_string(),
    }
}
