use crate::errors::AppError;
use axum::http::HeaderMap;

pub fn require_bearer(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let token = extract_bearer(headers).ok_or(AppError::Unauthorized)?;
    if token != expected {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Browser callers must come from a listed origin. Requests without an
/// `Origin` header (agents, CLIs) are not subject to the check.
pub fn check_origin(headers: &HeaderMap, allowed: &[String]) -> Result<(), AppError> {
    if allowed.is_empty() {
        return Ok(());
    }
    let Some(origin) = headers.get(axum::http::header::ORIGIN) else {
        return Ok(());
    };
    let origin = origin.to_str().map_err(|_| AppError::OriginDenied)?;
    if allowed.iter().any(|o| o == origin) {
        Ok(())
    } else {
        Err(AppError::OriginDenied)
    }
}

pub fn content_length_ok(headers: &HeaderMap, max_kb: usize) -> Result<(), AppError> {
    if let Some(len) = headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
    {
        if len > max_kb * 1024 {
            return Err(AppError::RequestTooLarge);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn bearer_required() {
        let mut h = HeaderMap::new();
        assert!(require_bearer(&h, "token").is_err());
        h.insert(header::AUTHORIZATION, "Bearer token".parse().unwrap());
        assert!(require_bearer(&h, "token").is_ok());
        assert!(require_bearer(&h, "wrong").is_err());
        h.insert(header::AUTHORIZATION, "Basic token".parse().unwrap());
        assert!(require_bearer(&h, "token").is_err());
    }

    #[test]
    fn origin_enforced_when_present() {
        let allowed = vec!["https://good.example".to_string()];
        let mut h = HeaderMap::new();
        assert!(check_origin(&h, &allowed).is_ok());
        h.insert(header::ORIGIN, "https://good.example".parse().unwrap());
        assert!(check_origin(&h, &allowed).is_ok());
        h.insert(header::ORIGIN, "https://bad.example".parse().unwrap());
        assert!(check_origin(&h, &allowed).is_err());
        assert!(check_origin(&h, &[]).is_ok());
    }

    #[test]
    fn content_length_capped() {
        let mut h = HeaderMap::new();
        h.insert(header::CONTENT_LENGTH, "2048".parse().unwrap());
        assert!(content_length_ok(&h, 2).is_ok());
        assert!(content_length_ok(&h, 1).is_err());
    }
}
