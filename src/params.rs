use crate::error::{BatchError, BatchResult};
use std::fmt;

/// Endpoint, credential and model for one provider/model pair
///
/// Values are only checked when a worker first uses them, so a profile can be
/// built from a partially populated environment and fail later with a
/// [`BatchError::Config`] naming the missing field.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestParams {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

impl RequestParams {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: Some(base_url.into()),
            api_key: Some(api_key.into()),
            model: Some(model.into()),
        }
    }

    /// Read `<PROVIDER>_BASE_URL` and `<PROVIDER>_API_KEY` from the environment
    ///
    /// Unset variables are kept as missing and reported on first use.
    pub fn from_env(provider: &str, model: impl Into<String>) -> Self {
        let prefix = provider.to_ascii_uppercase();
        Self::from_parts(
            std::env::var(format!("{prefix}_BASE_URL")).ok(),
            std::env::var(format!("{prefix}_API_KEY")).ok(),
            Some(model.into()),
        )
    }

    pub fn from_parts(
        base_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            base_url,
            api_key,
            model,
        }
    }

    /// Check that every field is present and not blank
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Config`] naming the first missing field
    pub fn validate(&self) -> BatchResult<()> {
        self.required().map(|_| ())
    }

    /// Validated `(base_url, api_key, model)`
    ///
    /// # Errors
    ///
    /// Same as [`RequestParams::validate`]
    pub fn required(&self) -> BatchResult<(&str, &str, &str)> {
        Ok((
            require(self.base_url.as_deref(), "base_url")?,
            require(self.api_key.as_deref(), "api_key")?,
            require(self.model.as_deref(), "model")?,
        ))
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

fn require<'a>(value: Option<&'a str>, field: &str) -> BatchResult<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BatchError::Config(format!(
            "Request parameter '{field}' is missing or empty"
        ))),
    }
}

impl fmt::Debug for RequestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestParams")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_params_validate() {
        let params = RequestParams::new("https://api.example.com/v1", "sk-test", "chat-model");
        assert!(params.validate().is_ok());
        assert_eq!(params.model(), Some("chat-model"));
    }

    #[test]
    fn test_missing_fields_are_named() {
        let cases = [
            (RequestParams::from_parts(None, Some("k".into()), Some("m".into())), "base_url"),
            (RequestParams::from_parts(Some("u".into()), None, Some("m".into())), "api_key"),
            (RequestParams::from_parts(Some("u".into()), Some("k".into()), None), "model"),
        ];

        for (params, field) in cases {
            match params.validate() {
                Err(BatchError::Config(msg)) => assert!(msg.contains(field), "{msg}"),
                other => panic!("expected config error for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_required_returns_fields() {
        let params = RequestParams::new("http://x", "key", "model");
        assert_eq!(params.required().unwrap(), ("http://x", "key", "model"));
    }

    #[test]
    fn test_blank_fields_count_as_missing() {
        let params = RequestParams::new("https://api.example.com", "   ", "m");
        assert!(matches!(params.validate(), Err(BatchError::Config(_))));

        let params = RequestParams::new("", "key", "m");
        assert!(matches!(params.validate(), Err(BatchError::Config(_))));
    }

    #[test]
    fn test_from_env_reads_prefixed_variables() {
        std::env::set_var("QBTESTPROVIDER_BASE_URL", "http://localhost:9999");
        std::env::set_var("QBTESTPROVIDER_API_KEY", "secret-key");

        let params = RequestParams::from_env("qbTestProvider", "model-x");
        assert_eq!(params.base_url(), Some("http://localhost:9999"));
        assert_eq!(params.api_key(), Some("secret-key"));
        assert_eq!(params.model(), Some("model-x"));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_from_env_missing_variables_fail_lazily() {
        let params = RequestParams::from_env("QB_UNSET_PROVIDER_1234", "model-x");
        assert_eq!(params.base_url(), None);
        assert!(matches!(params.validate(), Err(BatchError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let params = RequestParams::new("http://x", "sk-very-secret", "m");
        let rendered = format!("{params:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
