use chrono::Utc;
use uuid::Uuid;

/// Allocate a session-unique entity id: `<prefix>_<millis>_<random>`.
pub fn generate_id(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), &random[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique_and_prefixed() {
        let ids: HashSet<String> = (0..500).map(|_| generate_id("node")).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.starts_with("node_")));
    }
}
