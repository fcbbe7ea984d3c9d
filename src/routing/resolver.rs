//! Request path resolution.
//!
//! # Responsibilities
//! - Map a request verb and path onto the canonical route key
//! - Extract the integer id, raw segments and gap segments for the handler
//!
//! # Resolution
//! ```text
//! segments[0] is the resource token
//! segments[1] parses as i64  → /:id, then segments[2] as method
//! otherwise                  → gap segments of the resource,
//!                              then the method segment,
//!                              then /:id if the next segment parses as i64
//! ```
//!
//! # Design Decisions
//! - Pure function over the gap table; no allocation beyond the result
//! - A segment that fails to parse as an integer is a routing signal,
//!   never an error

use crate::routing::table::{GapTable, Verb, ID_PLACEHOLDER};

/// Outcome of resolving one request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Canonical `"VERB /path"` key to look up.
    pub key: String,
    /// Parsed id, 0 when the path carries none.
    pub id: i64,
    /// Raw segments of the path.
    pub segments: Vec<String>,
    /// Gap segments of the resource, empty for id paths.
    pub gaps: Vec<String>,
}

/// Resolve `raw_path` (base path already stripped, no leading `/`).
pub fn resolve_path(method: &str, raw_path: &str, gaps: &GapTable) -> ResolvedPath {
    let segments: Vec<&str> = raw_path.split('/').collect();
    let verb = Verb::for_request(method);

    let mut key = String::with_capacity(raw_path.len() + 16);
    key.push_str(verb.as_str());
    key.push_str(" /");
    key.push_str(segments[0]);

    let present = |index: usize| segments.get(index).copied().filter(|s| !s.is_empty());

    let mut id = 0;
    let mut resource_gaps: Vec<String> = Vec::new();
    match segments.get(1).and_then(|s| s.parse::<i64>().ok()) {
        Some(parsed) => {
            id = parsed;
            push_segment(&mut key, ID_PLACEHOLDER);
            if let Some(method_segment) = present(2) {
                push_segment(&mut key, method_segment);
            }
        }
        None => {
            if let Some(gap) = gaps.get(segments[0]) {
                for segment in gap {
                    push_segment(&mut key, segment);
                }
                resource_gaps = gap.to_vec();
            }
            let method_index = resource_gaps.len() + 1;
            if let Some(method_segment) = present(method_index) {
                push_segment(&mut key, method_segment);
            }
            if let Some(parsed) = present(method_index + 1).and_then(|s| s.parse::<i64>().ok()) {
                id = parsed;
                push_segment(&mut key, ID_PLACEHOLDER);
            }
        }
    }

    ResolvedPath {
        key,
        id,
        segments: segments.into_iter().map(str::to_string).collect(),
        gaps: resource_gaps,
    }
}

fn push_segment(key: &mut String, segment: &str) {
    key.push('/');
    key.push_str(segment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::resource::ResourceDescriptor;
    use crate::routing::table::RouteTableBuilder;

    fn gap_table() -> GapTable {
        RouteTableBuilder::new()
            .descriptor(ResourceDescriptor::new("Users").with_gap("profile"))
            .descriptor(ResourceDescriptor::new("Docs").with_gap("static/v2"))
            .build()
            .unwrap()
            .gaps
    }

    #[test]
    fn test_id_path() {
        let resolved = resolve_path("GET", "users/5/image_url", &GapTable::default());
        assert_eq!(resolved.key, "GET /users/:id/image_url");
        assert_eq!(resolved.id, 5);
        assert_eq!(resolved.segments, vec!["users", "5", "image_url"]);
        assert!(resolved.gaps.is_empty());
    }

    #[test]
    fn test_id_path_without_method() {
        let resolved = resolve_path("PUT", "users/-12/", &GapTable::default());
        assert_eq!(resolved.key, "PUT /users/:id");
        assert_eq!(resolved.id, -12);
    }

    #[test]
    fn test_plain_paths() {
        let gaps = GapTable::default();
        assert_eq!(resolve_path("GET", "users/image_url", &gaps).key, "GET /users/image_url");
        assert_eq!(resolve_path("POST", "users/image_url", &gaps).key, "POST /users/image_url");
        assert_eq!(resolve_path("GET", "users", &gaps).key, "GET /users");
        assert_eq!(resolve_path("GET", "", &gaps).key, "GET /");

        let resolved = resolve_path("GET", "users/photo/9", &gaps);
        assert_eq!(resolved.key, "GET /users/photo/:id");
        assert_eq!(resolved.id, 9);

        let resolved = resolve_path("GET", "users/photo/nine", &gaps);
        assert_eq!(resolved.key, "GET /users/photo");
        assert_eq!(resolved.id, 0);
    }

    #[test]
    fn test_gap_paths() {
        let gaps = gap_table();

        let resolved = resolve_path("GET", "users/profile/name", &gaps);
        assert_eq!(resolved.key, "GET /users/profile/name");
        assert_eq!(resolved.id, 0);
        assert_eq!(resolved.gaps, vec!["profile"]);

        let resolved = resolve_path("DELETE", "docs/static/v2/page/3", &gaps);
        assert_eq!(resolved.key, "DELETE /docs/static/v2/page/:id");
        assert_eq!(resolved.id, 3);
        assert_eq!(resolved.gaps, vec!["static", "v2"]);

        // The gap is taken from the table, not from the request.
        let resolved = resolve_path("GET", "users/anything/name", &gaps);
        assert_eq!(resolved.key, "GET /users/profile/name");
    }

    #[test]
    fn test_numeric_second_segment_wins_over_gap() {
        let resolved = resolve_path("GET", "users/7/name", &gap_table());
        assert_eq!(resolved.key, "GET /users/:id/name");
        assert!(resolved.gaps.is_empty());
    }

    #[test]
    fn test_verb_normalisation() {
        let gaps = GapTable::default();
        assert_eq!(resolve_path("HEAD", "users/name", &gaps).key, "GET /users/name");
        assert_eq!(resolve_path("OPTIONS", "users/name", &gaps).key, "GET /users/name");
        assert_eq!(resolve_path("PATCH", "users/name", &gaps).key, "GET /users/name");
        assert_eq!(resolve_path("DELETE", "users/5", &gaps).key, "DELETE /users/:id");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let gaps = gap_table();
        for path in ["users/profile/name", "users/5/image_url", "docs/static/v2/page/3", ""] {
            assert_eq!(resolve_path("GET", path, &gaps), resolve_path("GET", path, &gaps));
        }
    }
}
