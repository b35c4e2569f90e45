//! Capture settings loaded from TOML.
//!
//! ```toml
//! expected = "Error"
//! assert_mode = false
//!
//! [profiles.strict]
//! expected = "IndexOutOfBounds"
//! assert_mode = true
//! ```
//!
//! Type names resolve through [`FailureType::lookup`], so user types must be
//! registered before a profile naming them is resolved. Profile fields that
//! are left out inherit the top-level values.

use std::collections::BTreeMap;
use std::path::Path;

use catchfail_kernel::{
    CatchError, FAILURE, FailureType, Interceptor, InterceptorConfig, Proxy, Target,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown failure type: {0}")]
    UnknownFailureType(String),

    #[error("unknown capture profile: {0}")]
    UnknownProfile(String),

    #[error(transparent)]
    Catch(#[from] CatchError),
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    pub assert_mode: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, ProfileSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assert_mode: Option<bool>,
}

impl HarnessSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Self::parse(text, "<inline>")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, path: &str) -> Result<Self, SettingsError> {
        toml::from_str(text).map_err(|source| SettingsError::ParseToml {
            path: path.to_string(),
            source,
        })
    }

    /// Settings from the top-level keys alone.
    pub fn defaults(&self) -> Result<CaptureSettings, SettingsError> {
        Ok(CaptureSettings {
            expected: resolve(self.expected.as_deref())?,
            assert_mode: self.assert_mode,
        })
    }

    /// Settings of a named profile, layered over the top-level keys.
    pub fn profile(&self, name: &str) -> Result<CaptureSettings, SettingsError> {
        let profile = self
            .profiles
            .get(name)
            .ok_or_else(|| SettingsError::UnknownProfile(name.to_string()))?;
        let expected = profile.expected.as_deref().or(self.expected.as_deref());
        let settings = CaptureSettings {
            expected: resolve(expected)?,
            assert_mode: profile.assert_mode.unwrap_or(self.assert_mode),
        };
        tracing::debug!(
            profile = name,
            expected = settings.expected.map(FailureType::name),
            assert_mode = settings.assert_mode,
            "capture profile resolved"
        );
        Ok(settings)
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

/// An absent name means the root type; an empty one means none at all.
fn resolve(name: Option<&str>) -> Result<Option<&'static FailureType>, SettingsError> {
    match name {
        None => Ok(Some(&FAILURE)),
        Some("") => Ok(None),
        Some(name) => FailureType::lookup(name)
            .map(Some)
            .ok_or_else(|| SettingsError::UnknownFailureType(name.to_string())),
    }
}

/// Resolved capture settings, ready to wrap targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    expected: Option<&'static FailureType>,
    assert_mode: bool,
}

impl CaptureSettings {
    pub fn new(expected: &'static FailureType, assert_mode: bool) -> Self {
        Self {
            expected: Some(expected),
            assert_mode,
        }
    }

    pub fn expected(&self) -> Option<&'static FailureType> {
        self.expected
    }

    pub fn assert_mode(&self) -> bool {
        self.assert_mode
    }

    /// Wrap `target` the way `catch_only`/`verify_only` would.
    pub fn wrap<T: Target>(&self, target: T) -> Result<Proxy<T>, SettingsError> {
        let config = InterceptorConfig::builder()
            .target(target)
            .maybe_expected(self.expected)
            .assert_mode(self.assert_mode)
            .build()?;
        Ok(catchfail_kernel::build(config)?)
    }

    /// Interceptor for closure-style capture.
    pub fn interceptor(&self) -> Result<Interceptor, SettingsError> {
        let expected = self
            .expected
            .ok_or_else(|| CatchError::Argument("expected type must not be none".to_string()))?;
        Ok(Interceptor::new(expected, self.assert_mode))
    }
}
