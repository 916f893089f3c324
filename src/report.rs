//! Plain-text rendering of a translated search for the terminal.

use crate::shodan::ShodanError;
use crate::shodan::types::{HostMatch, SearchResults};
use crate::translate::Translation;

const RULE_WIDTH: usize = 80;
const MISSING: &str = "N/A";

pub const DEFAULT_LIMIT: usize = 10;

/// Query and provenance are printed verbatim so the user always sees which
/// path produced the query; Shodan errors are printed without embellishment.
pub fn format_report(
    question: &str,
    translation: &Translation,
    outcome: &Result<SearchResults, ShodanError>,
    limit: usize,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = format!("\n{rule}\n");
    out.push_str(&format!("QUESTION: {question}\n"));
    out.push_str(&format!("QUERY:    {}\n", translation.result.query));
    out.push_str(&format!("SOURCE:   {}\n", translation.result.explanation));
    if let Some(reason) = &translation.degraded {
        out.push_str(&format!(
            "NOTE:     AI translation unavailable ({reason}); heuristic translation used.\n"
        ));
    }
    out.push_str(&format!("{rule}\n\n"));

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            out.push_str("ERROR RETURNED BY THE SHODAN API:\n");
            out.push_str(&format!("   {e}\n"));
            return out;
        }
    };

    if results.total == 0 {
        out.push_str("No results.\n");
        out.push_str("   Shodan answered correctly but found no matches for the generated\n");
        out.push_str("   query. Try adjusting the product, port or country filters, or check\n");
        out.push_str("   whether the search is too specific.\n");
        return out;
    }

    out.push_str(&format!("Total results: {}\n\n", results.total));

    if results.matches.is_empty() {
        out.push_str("The Shodan response contains no 'matches', possibly because of an API\n");
        out.push_str("   change or a different response type.\n");
        return out;
    }

    out.push_str("First results:\n\n");
    for (i, host) in results.matches.iter().take(limit).enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, format_host(host)));
    }
    out
}

fn format_host(host: &HostMatch) -> String {
    let ip = host.ip_str.as_deref().unwrap_or(MISSING);
    let port = host
        .port
        .map(|p| p.to_string())
        .unwrap_or_else(|| MISSING.to_string());
    let org = host.org.as_deref().unwrap_or(MISSING);
    let location = host.location.as_ref();
    let country = location
        .and_then(|l| l.country_name.as_deref())
        .unwrap_or(MISSING);
    let city = location
        .and_then(|l| l.city.as_deref())
        .filter(|c| !c.is_empty())
        .map(|c| format!(" - {c}"))
        .unwrap_or_default();
    format!("{ip}:{port} | {org} | {country}{city}")
}
