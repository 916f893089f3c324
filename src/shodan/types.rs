use serde::Deserialize;

/// Raw body of `/shodan/host/search`. Errors arrive as `{"error": "..."}`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub total: Option<u64>,
    pub matches: Option<Vec<HostMatch>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostMatch {
    pub ip_str: Option<String>,
    pub port: Option<u16>,
    pub org: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub country_name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug)]
pub struct SearchResults {
    pub total: u64,
    pub matches: Vec<HostMatch>,
}
