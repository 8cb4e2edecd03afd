use subtle::ConstantTimeEq;
use uuid::Uuid;

pub trait CsrfValidator: Send + Sync {
    /// Token to embed into rendered forms.
    fn token(&self) -> &str;

    fn validate(&self, submitted: Option<&str>) -> bool;
}

/// One token shared by every form of the process.
#[derive(Debug, Clone)]
pub struct SharedTokenCsrf {
    token: String,
}

impl SharedTokenCsrf {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn random() -> Self {
        Self::new(Uuid::new_v4().simple().to_string())
    }
}

impl CsrfValidator for SharedTokenCsrf {
    fn token(&self) -> &str {
        &self.token
    }

    fn validate(&self, submitted: Option<&str>) -> bool {
        match submitted {
            Some(submitted) => self.token.as_bytes().ct_eq(submitted.as_bytes()).into(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_only_the_issued_token() {
        let csrf = SharedTokenCsrf::new("abc123");
        assert!(csrf.validate(Some("abc123")));
        assert!(!csrf.validate(Some("abc124")));
        assert!(!csrf.validate(Some("abc")));
        assert!(!csrf.validate(Some("")));
        assert!(!csrf.validate(None));
    }

    #[test]
    fn longer_submission_with_matching_prefix_is_rejected() {
        let csrf = SharedTokenCsrf::new("abc123");
        assert!(!csrf.validate(Some("abc1234")));
        assert!(!csrf.validate(Some("abc123 ")));
    }

    #[test]
    fn random_tokens_differ() {
        let a = SharedTokenCsrf::random();
        let b = SharedTokenCsrf::random();
        assert_eq!(a.token().len(), 32);
        assert_ne!(a.token(), b.token());
    }
}
