use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::base::{self, BaseGroup};
use crate::error::DcecError;
use crate::namespace::Namespace;

pub const DEFAULT_CONFIG_FILENAME: &str = "dcec.toml";

pub const DEFAULT_MAX_DEPTH: usize = 256;

fn default_comment_markers() -> Vec<char> {
    vec!['#', ';']
}

/// Knobs of a single parse call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Deepest nesting the resolver will follow before giving up.
    pub max_depth: usize,
    pub comment_markers: Vec<char>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            comment_markers: default_comment_markers(),
        }
    }
}

/// Contents of a `dcec.toml` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub max_depth: usize,
    pub comment_markers: Vec<char>,
    pub base: Vec<BaseGroup>,
    pub prototypes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            comment_markers: default_comment_markers(),
            base: BaseGroup::ALL.to_vec(),
            prototypes: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(body: &str, source: &str) -> Result<Self, DcecError> {
        let config: Config = toml::from_str(body).map_err(|err| DcecError::Config {
            path: source.to_string(),
            reason: format!("invalid TOML: {}", err.message()),
        })?;
        config.validate(source)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, DcecError> {
        let source = path.display().to_string();
        let body = fs::read_to_string(path).map_err(|err| DcecError::Config {
            path: source.clone(),
            reason: format!("failed to read: {err}"),
        })?;
        Self::from_toml_str(&body, &source)
    }

    /// Loads `explicit` when given, else `dcec.toml` in the working
    /// directory when it exists, else the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, DcecError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILENAME);
        if fallback.is_file() {
            tracing::debug!(path = DEFAULT_CONFIG_FILENAME, "using configuration file");
            return Self::load(fallback);
        }
        Ok(Self::default())
    }

    pub fn validate(&self, source: &str) -> Result<(), DcecError> {
        let invalid = |reason: String| DcecError::Config {
            path: source.to_string(),
            reason,
        };
        if self.max_depth == 0 {
            return Err(invalid("max_depth must be at least 1".to_string()));
        }
        if let Some(marker) = self
            .comment_markers
            .iter()
            .find(|c| matches!(c, '(' | ')' | '[' | ']' | ',' | '\\') || c.is_whitespace())
        {
            return Err(invalid(format!("{marker:?} cannot be a comment marker")));
        }
        for (i, group) in self.base.iter().enumerate() {
            if self.base[..i].contains(group) {
                return Err(invalid(format!(
                    "base group {} is listed twice",
                    group.as_str()
                )));
            }
        }
        Ok(())
    }

    pub fn options(&self) -> ParseOptions {
        ParseOptions {
            max_depth: self.max_depth,
            comment_markers: self.comment_markers.clone(),
        }
    }

    /// The session namespace: the selected base groups, then every
    /// prototype in order.
    pub fn namespace(&self) -> Result<Namespace, DcecError> {
        let mut ns = Namespace::new();
        base::load_groups(&mut ns, &self.base)?;
        for prototype in &self.prototypes {
            ns.declare(prototype)?;
        }
        Ok(ns)
    }
}
