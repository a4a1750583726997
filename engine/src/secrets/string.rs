use std::fmt;
use std::sync::Arc;

/// An API credential that never prints its value.
///
/// Cloning is cheap so the same key can be shared by providers serving
/// concurrent runs. `Debug` and `Display` show only `[REDACTED]`; the value is
/// reachable through [`SecretString::expose`] alone.
#[derive(Clone)]
pub struct SecretString(Arc<str>);

impl SecretString {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(Arc::from(s.as_ref()))
    }

    /// The raw value, for request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True for an empty or whitespace-only value
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
