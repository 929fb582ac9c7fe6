//! Declarative chain configuration, read from JSON.

use std::path::Path;

use daisychain_core::{Argument, ArgumentSource};
use serde::{Deserialize, Serialize};

use crate::error::WiringError;
use crate::registry::TargetRegistry;

/// Pipelines of one interface.
///
/// ```json
/// {
///   "interface": "PriceCalculator",
///   "pipelines": [
///     {
///       "method": "calculatePrice",
///       "steps": [
///         { "target": "base", "arguments": [{ "from": "context" }, { "from": "call", "index": 0 }] }
///       ]
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub interface: String,
    pub pipelines: Vec<PipelineConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Interface method identifier.
    pub method: String,
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Name the target was registered under.
    pub target: String,
    /// Target method; defaults to the pipeline's method identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub arguments: Vec<ArgumentConfig>,
}

/// One step argument. Value types are taken from the target method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case", deny_unknown_fields)]
pub enum ArgumentConfig {
    #[serde(rename = "call")]
    Call {
        index: usize,
        #[serde(default)]
        required: bool,
    },
    Appendix {
        /// Registered owner name or a literal UUID.
        owner: String,
        #[serde(default)]
        required: bool,
    },
    AppendixSet {
        owner: String,
        #[serde(default)]
        required: bool,
        #[serde(default)]
        required_not_empty: bool,
    },
    Context,
}

impl ChainConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::Parse`] for malformed JSON or unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self, WiringError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::Io`] if the file cannot be read and
    /// [`WiringError::Parse`] if it is not a valid configuration.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WiringError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| WiringError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

impl ArgumentConfig {
    /// Converts to a core argument, resolving owner names through `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::UnknownOwner`] for an owner that is neither
    /// registered nor a UUID.
    pub fn to_argument(&self, registry: &TargetRegistry) -> Result<Argument, WiringError> {
        let argument = match self {
            Self::Call { index, required } => {
                with_required(Argument::inferred(ArgumentSource::Positional { index: *index }), *required)
            }
            Self::Appendix { owner, required } => with_required(
                Argument::inferred(ArgumentSource::Appendix {
                    owner: registry.resolve_owner(owner)?,
                }),
                *required,
            ),
            Self::AppendixSet {
                owner,
                required,
                required_not_empty,
            } => {
                let argument = Argument::inferred(ArgumentSource::AppendixSet {
                    owner: registry.resolve_owner(owner)?,
                });
                if *required_not_empty {
                    argument.required_not_empty()
                } else {
                    with_required(argument, *required)
                }
            }
            Self::Context => Argument::context(),
        };
        Ok(argument)
    }
}

fn with_required(argument: Argument, required: bool) -> Argument {
    if required {
        argument.required()
    } else {
        argument
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use daisychain_core::OwnerId;

    use super::*;

    const JSON: &str = r#"{
        "interface": "PriceCalculator",
        "pipelines": [{
            "method": "calculatePrice",
            "steps": [
                { "target": "base", "arguments": [{ "from": "context" }, { "from": "call", "index": 0 }] },
                {
                    "target": "vouchers",
                    "method": "apply",
                    "arguments": [
                        { "from": "context" },
                        { "from": "appendix_set", "owner": "marketing", "required_not_empty": true }
                    ]
                }
            ]
        }]
    }"#;

    #[test]
    fn parses_steps_and_arguments() {
        let config = ChainConfig::from_json_str(JSON).unwrap();
        assert_eq!(config.interface, "PriceCalculator");
        let steps = &config.pipelines[0].steps;
        assert_eq!(steps[0].method, None);
        assert_eq!(steps[1].method.as_deref(), Some("apply"));
        assert_eq!(
            steps[0].arguments[1],
            ArgumentConfig::Call {
                index: 0,
                required: false
            }
        );
        assert_eq!(
            steps[1].arguments[1],
            ArgumentConfig::AppendixSet {
                owner: "marketing".to_string(),
                required: false,
                required_not_empty: true,
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ChainConfig::from_json_str(r#"{ "interface": "X", "pipelines": [], "extra": 1 }"#).unwrap_err();
        assert!(matches!(err, WiringError::Parse(_)));
    }

    #[test]
    fn misspelled_argument_flag_is_rejected() {
        let typo = serde_json::from_str::<ArgumentConfig>(
            r#"{ "from": "appendix", "owner": "employment", "requird": true }"#,
        );
        assert!(typo.is_err());

        let json = r#"{
            "interface": "PriceCalculator",
            "pipelines": [{
                "method": "calculatePrice",
                "steps": [{ "target": "base", "arguments": [{ "from": "call", "index": 0, "require": true }] }]
            }]
        }"#;
        assert!(matches!(ChainConfig::from_json_str(json), Err(WiringError::Parse(_))));

        let flags = serde_json::from_str::<ArgumentConfig>(
            r#"{ "from": "appendix", "owner": "employment", "required": true }"#,
        )
        .unwrap();
        assert_eq!(
            flags,
            ArgumentConfig::Appendix {
                owner: "employment".to_string(),
                required: true
            }
        );
    }

    #[test]
    fn owners_resolve_by_name_or_uuid() {
        let registry = TargetRegistry::new();
        let marketing = OwnerId::from_u128(2);
        registry.register_owner("marketing", marketing);

        let by_name = ArgumentConfig::Appendix {
            owner: "marketing".to_string(),
            required: true,
        }
        .to_argument(&registry)
        .unwrap();
        assert_eq!(by_name.source, ArgumentSource::Appendix { owner: marketing });
        assert!(by_name.required);

        let literal = ArgumentConfig::Appendix {
            owner: "00000000-0000-0000-0000-000000000002".to_string(),
            required: false,
        }
        .to_argument(&registry)
        .unwrap();
        assert_eq!(literal.source, ArgumentSource::Appendix { owner: marketing });

        let err = ArgumentConfig::Appendix {
            owner: "accounting".to_string(),
            required: false,
        }
        .to_argument(&registry)
        .unwrap_err();
        assert!(matches!(err, WiringError::UnknownOwner { ref name } if name == "accounting"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ChainConfig::from_path("/nonexistent/chain.json").unwrap_err();
        assert!(matches!(err, WiringError::Io { ref path, .. } if path.ends_with("chain.json")));
    }
}
