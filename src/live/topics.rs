//! Names of the topics the backend publishes visit notifications on

const NEW_VISIT: &str = "https://shlink.io/new-visit";
const NEW_ORPHAN_VISIT: &str = "https://shlink.io/new-orphan-visit";

/// Any new visit on any short URL
pub fn visits() -> String {
    NEW_VISIT.to_string()
}

/// New visits that did not match a short URL
pub fn orphan_visits() -> String {
    NEW_ORPHAN_VISIT.to_string()
}

/// New visits on one short URL
pub fn short_url_visits(short_code: &str) -> String {
    format!("{NEW_VISIT}/{short_code}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(visits(), "https://shlink.io/new-visit");
        assert_eq!(orphan_visits(), "https://shlink.io/new-orphan-visit");
        assert_eq!(short_url_visits("abc123"), "https://shlink.io/new-visit/abc123");
    }
}
