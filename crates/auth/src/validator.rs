use crate::AuthError;

/// Authenticates a request against a single shared secret (§1 Non-goals:
/// no RBAC, no per-tenant isolation — just "does this caller know the
/// key"). HTTP header extraction and the WebSocket query-param variant
/// live in `strym-api`; this crate only holds the comparison.
pub trait ApiKeyValidator: Send + Sync {
    fn validate(&self, provided: Option<&str>) -> Result<(), AuthError>;
}

#[derive(Debug, Clone)]
pub struct SharedSecretValidator {
    secret: String,
}

impl SharedSecretValidator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl ApiKeyValidator for SharedSecretValidator {
    fn validate(&self, provided: Option<&str>) -> Result<(), AuthError> {
        match provided {
            None => Err(AuthError::MissingKey),
            Some(key) if key == self.secret => Ok(()),
            Some(_) => Err(AuthError::InvalidKey),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_key() {
        let validator = SharedSecretValidator::new("secret");
        assert_eq!(validator.validate(None), Err(AuthError::MissingKey));
    }

    #[test]
    fn rejects_wrong_key() {
        let validator = SharedSecretValidator::new("secret");
        assert_eq!(validator.validate(Some("wrong")), Err(AuthError::InvalidKey));
    }

    #[test]
    fn accepts_matching_key() {
        let validator = SharedSecretValidator::new("secret");
        assert_eq!(validator.validate(Some("secret")), Ok(()));
    }
}
