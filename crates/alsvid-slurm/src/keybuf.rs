//! Namespaced environment-key builder.
//!
//! Every variable this plugin publishes is scoped by resource name,
//! `{name}_{suffix}`, so two resources in one job never collide. The
//! builder reuses one backing `String` across calls; capacity grows
//! amortized-doubling and never shrinks, so a hook that touches many
//! resources allocates a handful of times at most.

/// Reusable builder for `{resource}_{suffix}` environment keys.
#[derive(Debug, Default)]
pub struct EnvKeyBuf {
    buf: String,
}

impl EnvKeyBuf {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `{resource}_{suffix}` into the shared buffer.
    ///
    /// The returned slice borrows the builder and is valid until the next
    /// call.
    pub fn build(&mut self, resource: &str, suffix: &str) -> &str {
        self.buf.clear();
        self.buf.reserve(resource.len() + 1 + suffix.len());
        self.buf.push_str(resource);
        self.buf.push('_');
        self.buf.push_str(suffix);
        &self.buf
    }

    /// Current backing capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key() {
        let mut keys = EnvKeyBuf::new();
        assert_eq!(
            keys.build("heron1", "QRMI_JOB_ACQUISITION_TOKEN"),
            "heron1_QRMI_JOB_ACQUISITION_TOKEN"
        );
        assert_eq!(keys.build("a", "B"), "a_B");
    }

    #[test]
    fn test_capacity_never_shrinks() {
        let mut keys = EnvKeyBuf::new();
        keys.build("a-rather-long-resource-name", "QRMI_JOB_TIMEOUT_SECONDS");
        let grown = keys.capacity();
        keys.build("x", "Y");
        assert!(keys.capacity() >= grown);
        assert_eq!(keys.build("x", "Y"), "x_Y");
    }

    #[test]
    fn test_repeated_builds_do_not_accumulate() {
        let mut keys = EnvKeyBuf::new();
        for _ in 0..100 {
            assert_eq!(keys.build("qpu", "SUFFIX"), "qpu_SUFFIX");
        }
    }

    #[test]
    fn test_empty_parts() {
        let mut keys = EnvKeyBuf::new();
        assert_eq!(keys.build("", "SUFFIX"), "_SUFFIX");
        assert_eq!(keys.build("qpu", ""), "qpu_");
    }
}
