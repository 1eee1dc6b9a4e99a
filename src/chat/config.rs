//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, the resolved [`ChatConfig`], and
//! loading of the API credential from a secrets file or the environment.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::client::API_KEY_ENV;
use crate::error::{Error, Result};
use crate::text::DEFAULT_WORD_LIMIT;
use crate::types::Model;

/// Default maximum tokens per response.
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default number of stored messages before a reset is required.
pub const DEFAULT_MESSAGE_CAP: usize = 20;

/// Name of the credential inside a secrets file.
pub const SECRET_KEY_NAME: &str = "deepseek_api_key";

/// Instruction sent ahead of every request in the feedback-assistant preset.
pub const FEEDBACK_SYSTEM_PROMPT: &str = "You are a helpful writing assistant that specializes in providing constructive feedback on paraphrasing tasks.
When reviewing a student's paraphrased text:
1. Assess how well they've maintained the original meaning
2. Evaluate their use of different sentence structures and vocabulary
3. Provide constructive suggestions for improvement but not suggested version
4. Asking one follow-up question that encourages the student to revise their own answer

Be encouraging but honest. Focus on helping the student improve their paraphrasing skills.";

/// Opening assistant message of the feedback-assistant preset.  Restored after every reset.
pub const PARAPHRASING_TASK: &str = "**Paraphrasing Task:** Please read the paragraph below and rewrite it in your own words. Try to maintain the original meaning, but use different sentence structures and vocabulary.

**Original Paragraph:** In today's fast-paced world, technology plays a crucial role in almost every aspect of our lives. From communication and transportation to healthcare and education, advancements in technology have significantly improved the way we live and work. However, while these innovations offer many benefits, they also raise concerns about privacy, job displacement, and the overreliance on digital tools. It is important for individuals and societies to find a balance between embracing techn...

Submit your paraphrased version below, and I'll provide constructive feedback to help you improve.";

/// Command-line arguments for the seekchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: deepseek-chat)", "MODEL")]
    pub model: Option<String>,

    /// System instruction to prepend to every request.
    #[arrrg(optional, "System instruction (default: paraphrasing feedback)", "PROMPT")]
    pub system: Option<String>,

    /// Send no system instruction at all.
    #[arrrg(flag, "Send no system instruction")]
    pub no_system: bool,

    /// Opening assistant message restored after every reset.
    #[arrrg(optional, "Opening assistant message (default: paraphrasing task)", "TEXT")]
    pub seed: Option<String>,

    /// Start every conversation empty.
    #[arrrg(flag, "Start conversations without an opening message")]
    pub no_seed: bool,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 1000)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    /// Stored messages allowed before a reset is required.
    #[arrrg(optional, "Messages per conversation (default: 20)", "COUNT")]
    pub message_cap: Option<usize>,

    /// Tokens allowed per message.
    #[arrrg(optional, "Words per message and reply (default: 300)", "WORDS")]
    pub word_limit: Option<usize>,

    /// Base URL of the API.
    #[arrrg(optional, "API base URL (default: https://api.deepseek.com/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// YAML secrets file holding `deepseek_api_key`.
    #[arrrg(optional, "YAML secrets file with deepseek_api_key", "PATH")]
    pub secrets: Option<String>,

    /// File to append JSON-lines client logs to.
    #[arrrg(optional, "Append client events as JSON lines to this file", "PATH")]
    pub log_file: Option<String>,

    /// File to append biometrics readings to.
    #[arrrg(optional, "Append metric readings to this file on /stats and exit", "PATH")]
    pub metrics_file: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Instruction prepended at request time; never stored in the log.
    pub system_prompt: Option<String>,

    /// Assistant message a fresh or reset conversation starts with.
    pub seed_message: Option<String>,

    /// Maximum tokens per response.
    pub max_tokens: Option<u32>,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,

    /// Stored messages allowed before further input is refused.
    pub message_cap: usize,

    /// Tokens allowed in a user message or an assistant reply.
    pub word_limit: usize,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Override for the API base URL.
    pub base_url: Option<String>,

    /// Request timeout; `None` waits for the transport to give up.
    pub timeout: Option<Duration>,

    /// Secrets file to read the API key from instead of the environment.
    pub secrets_path: Option<PathBuf>,

    /// JSON-lines client log destination.
    pub log_file: Option<PathBuf>,

    /// Biometrics output; metrics are not collected without one.
    pub metrics_file: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults reproduce the paraphrasing feedback assistant:
    /// - Model: deepseek-chat
    /// - Max tokens: 1000, temperature: 0.7
    /// - System instruction and opening task message: enabled
    /// - 20 messages per conversation, 300 words per message
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_prompt: Some(FEEDBACK_SYSTEM_PROMPT.to_string()),
            seed_message: Some(PARAPHRASING_TASK.to_string()),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            temperature: Some(DEFAULT_TEMPERATURE),
            message_cap: DEFAULT_MESSAGE_CAP,
            word_limit: DEFAULT_WORD_LIMIT,
            use_color: true,
            base_url: None,
            timeout: None,
            secrets_path: None,
            log_file: None,
            metrics_file: None,
        }
    }

    /// A plain chat: no system instruction and no opening message.
    pub fn plain() -> Self {
        Self::new().with_system_prompt(None).with_seed_message(None)
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets or clears the system instruction.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    /// Sets or clears the opening assistant message.
    pub fn with_seed_message(mut self, seed: Option<String>) -> Self {
        self.seed_message = seed;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the message cap.
    pub fn with_message_cap(mut self, cap: usize) -> Self {
        self.message_cap = cap;
        self
    }

    /// Sets the word limit.
    pub fn with_word_limit(mut self, limit: usize) -> Self {
        self.word_limit = limit;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Checks that limits and sampling values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.message_cap < 2 {
            return Err(Error::validation(
                "message cap must leave room for one exchange",
                Some("message_cap".to_string()),
            ));
        }
        if self.word_limit == 0 {
            return Err(Error::validation(
                "word limit must be at least 1",
                Some("word_limit".to_string()),
            ));
        }
        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(Error::validation(
                format!("temperature {temperature} is outside 0.0..=2.0"),
                Some("temperature".to_string()),
            ));
        }
        if self.max_tokens == Some(0) {
            return Err(Error::validation(
                "max tokens must be at least 1",
                Some("max_tokens".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let defaults = ChatConfig::new();
        let model = args
            .model
            .map(|s| s.parse::<Model>().unwrap_or(Model::Custom(s)))
            .unwrap_or(defaults.model.clone());
        let system_prompt = if args.no_system {
            None
        } else {
            args.system.or(defaults.system_prompt.clone())
        };
        let seed_message = if args.no_seed {
            None
        } else {
            args.seed.or(defaults.seed_message.clone())
        };
        let temperature = match args.temperature {
            Some(value) => Some(value.trim().parse::<f32>().map_err(|_| {
                Error::validation(
                    format!("temperature {value:?} is not a number"),
                    Some("temperature".to_string()),
                )
            })?),
            None => defaults.temperature,
        };

        let config = ChatConfig {
            model,
            system_prompt,
            seed_message,
            max_tokens: args.max_tokens.or(defaults.max_tokens),
            temperature,
            message_cap: args.message_cap.unwrap_or(DEFAULT_MESSAGE_CAP),
            word_limit: args.word_limit.unwrap_or(DEFAULT_WORD_LIMIT),
            use_color: !args.no_color,
            base_url: args.base_url,
            timeout: args.timeout_secs.map(Duration::from_secs),
            secrets_path: args.secrets.map(PathBuf::from),
            log_file: args.log_file.map(PathBuf::from),
            metrics_file: args.metrics_file.map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Deserialize)]
struct SecretsFile {
    deepseek_api_key: Option<String>,
}

/// Loads the API key.
///
/// With a path, the key is read from the `deepseek_api_key` entry of that YAML file.  Without
/// one, it comes from the `DEEPSEEK_API_KEY` environment variable.
///
/// # Errors
///
/// Returns [`Error::Config`] when the file cannot be read or the key is missing or empty, and a
/// serialization error when the file is not valid YAML.
pub fn load_api_key(secrets_path: Option<&Path>) -> Result<String> {
    let key = match secrets_path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|err| {
                Error::config(format!(
                    "could not read secrets file {}: {err}",
                    path.display()
                ))
            })?;
            let secrets: SecretsFile = serde_yaml::from_str(&content)?;
            secrets.deepseek_api_key.ok_or_else(|| {
                Error::config(format!(
                    "{SECRET_KEY_NAME} missing from secrets file {}",
                    path.display()
                ))
            })?
        }
        None => env::var(API_KEY_ENV).map_err(|_| {
            Error::config(format!(
                "no secrets file given and {API_KEY_ENV} environment variable not set"
            ))
        })?,
    };
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(Error::config(format!("{SECRET_KEY_NAME} is empty")));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("seekchat-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::DeepseekChat));
        assert_eq!(config.max_tokens, Some(1000));
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.message_cap, 20);
        assert_eq!(config.word_limit, 300);
        assert!(config.use_color);
        assert_eq!(config.system_prompt.as_deref(), Some(FEEDBACK_SYSTEM_PROMPT));
        assert_eq!(config.seed_message.as_deref(), Some(PARAPHRASING_TASK));
        assert!(config.timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn plain_config_has_no_system_or_seed() {
        let config = ChatConfig::plain();
        assert!(config.system_prompt.is_none());
        assert!(config.seed_message.is_none());
        assert_eq!(config.message_cap, DEFAULT_MESSAGE_CAP);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("deepseek-reasoner".to_string()),
            system: Some("You are helpful.".to_string()),
            no_seed: true,
            max_tokens: Some(200),
            temperature: Some("0.25".to_string()),
            message_cap: Some(6),
            word_limit: Some(50),
            timeout_secs: Some(30),
            secrets: Some("secrets.yaml".to_string()),
            metrics_file: Some("metrics.txt".to_string()),
            no_color: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::DeepseekReasoner));
        assert_eq!(config.system_prompt.as_deref(), Some("You are helpful."));
        assert!(config.seed_message.is_none());
        assert_eq!(config.max_tokens, Some(200));
        assert_eq!(config.temperature, Some(0.25));
        assert_eq!(config.message_cap, 6);
        assert_eq!(config.word_limit, 50);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.secrets_path, Some(PathBuf::from("secrets.yaml")));
        assert_eq!(config.metrics_file, Some(PathBuf::from("metrics.txt")));
        assert!(!config.use_color);
    }

    #[test]
    fn no_system_wins_over_system() {
        let args = ChatArgs {
            system: Some("ignored".to_string()),
            no_system: true,
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap().system_prompt.is_none());
    }

    #[test]
    fn bad_args_are_validation_errors() {
        let args = ChatArgs {
            temperature: Some("warm".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_validation());

        let args = ChatArgs {
            message_cap: Some(0),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_validation());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let err = ChatConfig::new().with_message_cap(0).validate().unwrap_err();
        assert!(err.is_validation());
        let err = ChatConfig::new().with_message_cap(1).validate().unwrap_err();
        assert!(err.is_validation());
        let err = ChatConfig::new().with_word_limit(0).validate().unwrap_err();
        assert!(err.is_validation());
        let err = ChatConfig::new()
            .with_temperature(Some(3.0))
            .validate()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn api_key_from_secrets_file() {
        let path = temp_file("secrets-ok.yaml", "deepseek_api_key: \"sk-from-file\"\n");
        assert_eq!(load_api_key(Some(&path)).unwrap(), "sk-from-file");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_secret_is_config_error() {
        let path = temp_file("secrets-missing.yaml", "other_key: value\n");
        assert!(load_api_key(Some(&path)).unwrap_err().is_config());
        let _ = std::fs::remove_file(&path);

        let path = temp_file("secrets-empty.yaml", "deepseek_api_key: \"  \"\n");
        assert!(load_api_key(Some(&path)).unwrap_err().is_config());
        let _ = std::fs::remove_file(&path);

        let missing = env::temp_dir().join("seekchat-does-not-exist.yaml");
        assert!(load_api_key(Some(&missing)).unwrap_err().is_config());
    }

    #[test]
    fn malformed_secrets_file_is_decode_error() {
        let path = temp_file("secrets-bad.yaml", "deepseek_api_key: [unclosed\n");
        assert!(load_api_key(Some(&path)).unwrap_err().is_decode());
        let _ = std::fs::remove_file(&path);
    }
}
