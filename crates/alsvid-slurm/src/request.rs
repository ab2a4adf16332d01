//! The `--qpu` request string.

/// An ordered list of requested resource names.
///
/// Parsed from the comma/space-delimited `--qpu` option value. Order is
/// preserved and determines acquisition order; duplicates survive parsing
/// and are resolved by the configured
/// [`DuplicatePolicy`](crate::config::DuplicatePolicy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    names: Vec<String>,
}

impl ResourceRequest {
    /// Parse an option value into an ordered name list.
    pub fn parse(raw: &str) -> Self {
        let names = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Self { names }
    }

    /// Requested names, in request order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of requested names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the request holds no names at all.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(raw: &str) -> Vec<String> {
        ResourceRequest::parse(raw).names().map(String::from).collect()
    }

    #[test]
    fn test_comma_delimited() {
        assert_eq!(parsed("qpu1,qpu2,qpu3"), ["qpu1", "qpu2", "qpu3"]);
    }

    #[test]
    fn test_space_and_mixed_delimiters() {
        assert_eq!(parsed("qpu1 qpu2"), ["qpu1", "qpu2"]);
        assert_eq!(parsed("qpu1, qpu2 ,\tqpu3"), ["qpu1", "qpu2", "qpu3"]);
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        assert_eq!(parsed("b,a,b"), ["b", "a", "b"]);
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert!(ResourceRequest::parse("").is_empty());
        assert!(ResourceRequest::parse("   \t ").is_empty());
        assert!(ResourceRequest::parse(",,,").is_empty());
    }

    #[test]
    fn test_single_name() {
        let request = ResourceRequest::parse("heron1");
        assert_eq!(request.len(), 1);
        assert_eq!(request.names().next().unwrap(), "heron1");
    }
}
