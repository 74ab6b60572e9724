//! Connection handshake
//!
//! The client opens with `user:password`, a capability byte and a NUL. The
//! server answers with a single capability byte, or closes the socket to
//! reject the credentials.

/// Capability requested by this client: compression and timestamps.
pub const CAPABILITY: u8 = 3;

/// Opening bytes for `credentials` (`user:password`, possibly empty).
pub fn encode_credentials(credentials: &str, capability: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(credentials.len() + 2);
    out.extend_from_slice(credentials.as_bytes());
    out.push(capability);
    out.push(0);
    out
}

/// Split a received opening into credentials and capability.
///
/// `opening` is everything up to, but excluding, the terminating NUL.
/// Returns `None` when it is empty or the credentials are not UTF-8.
pub fn parse_credentials(opening: &[u8]) -> Option<(&str, u8)> {
    let (&capability, credentials) = opening.split_last()?;
    Some((std::str::from_utf8(credentials).ok()?, capability))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_bytes() {
        assert_eq!(encode_credentials("user:pwd", CAPABILITY), b"user:pwd\x03\x00".to_vec());
        assert_eq!(encode_credentials("", CAPABILITY), vec![3, 0]);
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse_credentials(b"user:pwd\x03"), Some(("user:pwd", 3)));
        assert_eq!(parse_credentials(b"\x01"), Some(("", 1)));
        assert_eq!(parse_credentials(b""), None);
    }
}
