use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A DeepSeek model identifier.
///
/// This can be a predefined model or a custom string value for models that
/// may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for future or private models)
    Custom(String),
}

/// Known DeepSeek chat models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnownModel {
    /// The general chat model.
    DeepseekChat,

    /// The reasoning model.
    DeepseekReasoner,
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::DeepseekChat)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnownModel::DeepseekChat => write!(f, "deepseek-chat"),
            KnownModel::DeepseekReasoner => write!(f, "deepseek-reasoner"),
        }
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deepseek-chat" => Ok(KnownModel::DeepseekChat),
            "deepseek-reasoner" => Ok(KnownModel::DeepseekReasoner),
            _ => Err(format!("unknown model: {s}")),
        }
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<KnownModel>()
            .map(Model::Known)
            .unwrap_or_else(|_| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}
