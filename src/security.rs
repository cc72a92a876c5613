use subtle::ConstantTimeEq;

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing admin tokens and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Who is looking at the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Visitor,
    /// May see inline translation diagnostics.
    Privileged,
}

impl Viewer {
    pub fn is_privileged(self) -> bool {
        matches!(self, Viewer::Privileged)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Whether the Authorization header carries the admin token.
///
/// Always false when no admin token is configured.
pub fn is_admin(authorization: Option<&str>, admin_token: Option<&str>) -> bool {
    match (authorization.and_then(bearer_token), admin_token) {
        (Some(provided), Some(expected)) if !expected.is_empty() => {
            constant_time_compare(provided, expected)
        }
        _ => false,
    }
}

pub fn viewer_from_authorization(authorization: Option<&str>, admin_token: Option<&str>) -> Viewer {
    if is_admin(authorization, admin_token) {
        Viewer::Privileged
    } else {
        Viewer::Visitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret123", "secret123"));
        assert!(!constant_time_compare("secret123", "secret124"));
        assert!(!constant_time_compare("secret123", "secret12"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc  "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_viewer_from_authorization() {
        let token = Some("s3cret");
        assert_eq!(
            viewer_from_authorization(Some("Bearer s3cret"), token),
            Viewer::Privileged
        );
        assert_eq!(
            viewer_from_authorization(Some("Bearer wrong"), token),
            Viewer::Visitor
        );
        assert_eq!(viewer_from_authorization(None, token), Viewer::Visitor);
    }

    #[test]
    fn test_no_admin_token_means_nobody_is_privileged() {
        assert_eq!(
            viewer_from_authorization(Some("Bearer anything"), None),
            Viewer::Visitor
        );
        assert!(!is_admin(Some("Bearer "), Some("")));
    }
}
