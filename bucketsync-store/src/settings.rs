//! Store settings resolution.
//!
//! Precedence, highest first: explicit overrides (CLI flags) → environment →
//! profile file → defaults. The environment is passed in as a lookup function
//! so resolution is a pure function of its inputs.

use bucketsync_core::{config::DEFAULT_REGION, Profile};

use crate::error::StoreError;
use crate::sigv4::Credentials;

/// Credentials used against custom endpoints when none are configured
/// (LocalStack and MinIO test setups accept any key pair).
const LOCAL_TEST_KEY: &str = "test";

/// Values supplied explicitly by the caller for this invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOverrides {
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

/// Fully resolved settings for [`crate::S3Store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub region: String,
    /// `None` means the AWS endpoint for `region`.
    pub endpoint: Option<String>,
    pub path_style: bool,
    pub credentials: Credentials,
}

impl S3Settings {
    /// Resolve from the process environment.
    pub fn resolve(overrides: &StoreOverrides, profile: &Profile) -> Result<Self, StoreError> {
        Self::resolve_with(overrides, profile, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        overrides: &StoreOverrides,
        profile: &Profile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StoreError> {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let endpoint = overrides
            .endpoint
            .clone()
            .or_else(|| env("BUCKETSYNC_ENDPOINT"))
            .or_else(|| profile.endpoint.clone());

        let region = overrides
            .region
            .clone()
            .or_else(|| env("AWS_REGION"))
            .or_else(|| env("AWS_DEFAULT_REGION"))
            .or_else(|| profile.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let access_key_id = env("AWS_ACCESS_KEY_ID").or_else(|| profile.access_key_id.clone());
        let secret_access_key =
            env("AWS_SECRET_ACCESS_KEY").or_else(|| profile.secret_access_key.clone());
        let session_token = env("AWS_SESSION_TOKEN").or_else(|| profile.session_token.clone());

        let credentials = match (access_key_id, secret_access_key) {
            (Some(id), Some(secret)) => Credentials {
                access_key_id: id,
                secret_access_key: secret,
                session_token,
            },
            (None, None) if endpoint.is_some() => {
                tracing::debug!("no credentials configured; using static test credentials");
                Credentials::new(LOCAL_TEST_KEY, LOCAL_TEST_KEY)
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(StoreError::Settings(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together"
                        .to_string(),
                ))
            }
            (None, None) => {
                return Err(StoreError::Settings(
                    "no credentials: set AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY \
                     or add them to ~/.bucketsync/config.yaml"
                        .to_string(),
                ))
            }
        };

        // Custom endpoints rarely serve virtual-host buckets.
        let path_style = endpoint.is_some() || profile.path_style.unwrap_or(false);

        Ok(Self {
            region,
            endpoint,
            path_style,
            credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn endpoint_without_credentials_uses_test_keys_and_path_style() {
        let overrides = StoreOverrides {
            endpoint: Some("http://localhost:4566".into()),
            region: None,
        };
        let s = S3Settings::resolve_with(&overrides, &Profile::default(), env_of(&[])).unwrap();
        assert_eq!(s.credentials, Credentials::new("test", "test"));
        assert!(s.path_style);
        assert_eq!(s.region, "us-east-1");
    }

    #[test]
    fn flags_beat_environment_beat_profile() {
        let profile = Profile {
            region: Some("profile-region".into()),
            endpoint: Some("http://profile:9000".into()),
            ..Profile::default()
        };
        let env = env_of(&[
            ("AWS_REGION", "env-region"),
            ("AWS_ACCESS_KEY_ID", "id"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]);
        let overrides = StoreOverrides {
            endpoint: Some("http://flag:9000".into()),
            region: None,
        };
        let s = S3Settings::resolve_with(&overrides, &profile, env).unwrap();
        assert_eq!(s.endpoint.as_deref(), Some("http://flag:9000"));
        assert_eq!(s.region, "env-region");
        assert_eq!(s.credentials.access_key_id, "id");
    }

    #[test]
    fn profile_credentials_used_when_env_empty() {
        let profile = Profile {
            access_key_id: Some("pid".into()),
            secret_access_key: Some("psecret".into()),
            session_token: Some("tok".into()),
            ..Profile::default()
        };
        let env = env_of(&[("AWS_ACCESS_KEY_ID", "  ")]);
        let s = S3Settings::resolve_with(&StoreOverrides::default(), &profile, env).unwrap();
        assert_eq!(s.credentials.access_key_id, "pid");
        assert_eq!(s.credentials.session_token.as_deref(), Some("tok"));
        assert!(!s.path_style);
        assert!(s.endpoint.is_none());
    }

    #[test]
    fn aws_without_credentials_is_an_error() {
        let err = S3Settings::resolve_with(
            &StoreOverrides::default(),
            &Profile::default(),
            env_of(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Settings(_)), "got: {err}");
    }

    #[test]
    fn half_configured_credentials_are_an_error() {
        let err = S3Settings::resolve_with(
            &StoreOverrides::default(),
            &Profile::default(),
            env_of(&[("AWS_ACCESS_KEY_ID", "id")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be set together"));
    }
}
