use reqwest::Method;

/// Anti-forgery token injected by the hosting page. Sent only on
/// state-changing requests.
#[derive(Debug, Clone)]
pub struct CsrfToken {
    header: String,
    value: String,
}

impl CsrfToken {
    pub fn new(header: &str, value: String) -> Self {
        Self {
            header: header.to_string(),
            value,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header
    }

    /// Build the token headers for a request with the given method.
    pub fn headers(&self, method: &Method) -> Vec<(String, String)> {
        if is_safe(method) {
            return Vec::new();
        }
        vec![(self.header.clone(), self.value.clone())]
    }
}

/// RFC 9110 safe methods never carry the token.
pub fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_only_on_writes() {
        let token = CsrfToken::new("X-CSRFToken", "abc".to_string());
        assert!(token.headers(&Method::GET).is_empty());
        assert!(token.headers(&Method::HEAD).is_empty());
        assert_eq!(
            token.headers(&Method::PUT),
            vec![("X-CSRFToken".to_string(), "abc".to_string())]
        );
        assert_eq!(token.headers(&Method::POST).len(), 1);
        assert_eq!(token.headers(&Method::DELETE).len(), 1);
    }
}
