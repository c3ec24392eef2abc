//! Keeps private keys out of logs and serialized output.
//!
//! [`Redacted`] formats and serializes as `"<redacted>"` whatever it wraps.

use std::fmt::{self, Debug, Display};

/// Wrapper that redacts its inner value when formatted or serialized.
///
/// ```ignore
/// use surge_bridge::redact::Redacted;
///
/// tracing::info!(key = %Redacted(&config.evm.private_key), "Signer loaded");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, Copy, Default)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> serde::Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        "<redacted>".serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_key_never_formatted() {
        let key = Redacted("suiprivkey1qqqq".to_string());
        assert_eq!(format!("{:?}", key), "<redacted>");
        assert_eq!(format!("{}", key), "<redacted>");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"<redacted>\"");
        assert_eq!(key.expose(), "suiprivkey1qqqq");
    }
}
