use serde::{Deserialize, Serialize};

/// Closed time range in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub since_ms: i64,
    pub until_ms: i64,
}

impl QueryWindow {
    /// Window of `length_ms` ending at `now_ms`.
    pub fn ending_at(now_ms: i64, length_ms: i64) -> Self {
        Self {
            since_ms: now_ms - length_ms,
            until_ms: now_ms,
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.since_ms && timestamp <= self.until_ms
    }
}

/// Template for the recent `BrowserInteraction` events query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionQuery {
    pub window: QueryWindow,
}

impl InteractionQuery {
    pub const EVENT_TYPE: &'static str = "BrowserInteraction";

    pub fn new(window: QueryWindow) -> Self {
        Self { window }
    }

    pub fn to_nrql(&self) -> String {
        format!(
            "SELECT duration, asnLatitude, asnLongitude, timestamp FROM {} SINCE {} UNTIL {} LIMIT MAX",
            Self::EVENT_TYPE,
            self.window.since_ms,
            self.window.until_ms
        )
    }

    /// Query text plus the account it is scoped to.
    pub fn request(&self, account_id: u64) -> NrqlRequest {
        NrqlRequest {
            account_id,
            query: self.to_nrql(),
        }
    }
}

/// Body sent to the query endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NrqlRequest {
    pub account_id: u64,
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_ends_at_now() {
        let window = QueryWindow::ending_at(100_000, 30_000);
        assert_eq!(window.since_ms, 70_000);
        assert_eq!(window.until_ms, 100_000);
        assert!(window.contains(70_000));
        assert!(!window.contains(100_001));
    }

    #[test]
    fn nrql_text_matches_template() {
        let query = InteractionQuery::new(QueryWindow::ending_at(60_000, 30_000));
        assert_eq!(
            query.to_nrql(),
            "SELECT duration, asnLatitude, asnLongitude, timestamp FROM BrowserInteraction SINCE 30000 UNTIL 60000 LIMIT MAX"
        );
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = InteractionQuery::new(QueryWindow::ending_at(10, 5)).request(7);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["accountId"], 7);
        assert!(json["query"].as_str().unwrap().starts_with("SELECT duration"));
    }
}
