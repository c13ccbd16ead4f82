use crate::error::{Error, Result};
use hyper::HeaderMap;
use model::Uuid;

/// Extracts the session ID from a map of headers. The `sid` cookie holds the hex-encoded bytes
/// of the session's UUID.
pub fn extract_session(headers: &HeaderMap) -> Result<Uuid> {
    let session = headers
        .get("Cookie")
        .ok_or(Error::Unauthorized)?
        .as_bytes()
        .split(|&byte| byte == b';')
        .filter_map(|section| {
            let mid = section.iter().copied().position(|byte| byte == b'=')?;
            let (left, right) = section.split_at(mid);
            Some((left.trim_ascii(), right[1..].trim_ascii()))
        })
        .find_map(|(key, session)| (key == b"sid").then_some(session))
        .ok_or(Error::Unauthorized)?;

    let mut bytes = [0; 16];
    hex::decode_to_slice(session, &mut bytes).map_err(|_| Error::Unauthorized)?;
    Ok(Uuid::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderValue, COOKIE};

    fn headers(cookie: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(cookie));
        headers
    }

    #[test]
    fn finds_sid_among_other_cookies() {
        let headers = headers("theme=dark; sid=000102030405060708090a0b0c0d0e0f; lang=en");
        let sid = extract_session(&headers).unwrap();
        assert_eq!(sid, Uuid::from_u128(0x000102030405060708090a0b0c0d0e0f));
    }

    #[test]
    fn rejects_missing_or_malformed_sid() {
        assert!(matches!(extract_session(&HeaderMap::new()), Err(Error::Unauthorized)));
        assert!(matches!(extract_session(&headers("theme=dark")), Err(Error::Unauthorized)));
        assert!(matches!(extract_session(&headers("sid=zz")), Err(Error::Unauthorized)));
        assert!(matches!(extract_session(&headers("sid=0001")), Err(Error::Unauthorized)));
    }
}
