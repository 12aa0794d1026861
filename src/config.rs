//! Runtime configuration: telephony credentials, speech/LLM provider
//! credentials, transfer policy, and the listen port for the external
//! HTTP layer. Loadable from TOML with environment variables layered
//! on top, the way a deployed instance actually gets configured.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Telephony account credentials and the public URL the telephony
/// provider calls back into for control-plane webhooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_number: String,
    pub public_base_url: String,
}

/// Speech service credentials and model selection for STT/TTS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub stt_api_key: String,
    pub stt_model_id: String,
    pub tts_api_key: String,
    pub tts_model_id: String,
    pub sample_rate_hz: u32,
}

/// Language-service credentials and the model id to request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub model_id: String,
    pub base_url: Option<String>,
}

/// Policy for transferring a live call to a human.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub owner_phone_number: String,
}

/// The external HTTP layer's listen port. Recorded here so one config
/// file covers the whole deployment; this crate never binds it itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen_port: 8080 }
    }
}

/// Top-level configuration for the session runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub telephony: TelephonyConfig,
    pub speech: SpeechConfig,
    pub llm: LlmConfig,
    pub transfer: TransferConfig,
    pub server: ServerConfig,
}

impl Settings {
    /// Parse from a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, CoreError> {
        toml::from_str(raw).map_err(|e| CoreError::Config(format!("invalid config: {e}")))
    }

    /// Overlay environment variables on top of whatever TOML provided,
    /// so deployments can keep credentials out of the config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TELEPHONY_ACCOUNT_SID") {
            self.telephony.account_sid = v;
        }
        if let Ok(v) = std::env::var("TELEPHONY_AUTH_TOKEN") {
            self.telephony.auth_token = v;
        }
        if let Ok(v) = std::env::var("TELEPHONY_PHONE_NUMBER") {
            self.telephony.phone_number = v;
        }
        if let Ok(v) = std::env::var("PUBLIC_BASE_URL") {
            self.telephony.public_base_url = v;
        }
        if let Ok(v) = std::env::var("STT_API_KEY") {
            self.speech.stt_api_key = v;
        }
        if let Ok(v) = std::env::var("TTS_API_KEY") {
            self.speech.tts_api_key = v;
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Ok(v) = std::env::var("OWNER_PHONE_NUMBER") {
            self.transfer.owner_phone_number = v;
        }
        if let Ok(v) = std::env::var("LISTEN_PORT") {
            if let Ok(port) = v.parse() {
                self.server.listen_port = port;
            }
        }
    }

    /// Validate that every field required to run at all is present.
    /// Transfer-to-human is checked separately via
    /// [`Self::validate_transfer`] since a deployment may legitimately
    /// omit transfer support.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.telephony.account_sid.is_empty() {
            return Err(CoreError::Config("telephony.account_sid is required".into()));
        }
        if self.telephony.auth_token.is_empty() {
            return Err(CoreError::Config("telephony.auth_token is required".into()));
        }
        if self.telephony.phone_number.is_empty() {
            return Err(CoreError::Config("telephony.phone_number is required".into()));
        }
        if self.telephony.public_base_url.is_empty() {
            return Err(CoreError::Config(
                "telephony.public_base_url is required".into(),
            ));
        }
        if self.llm.api_key.is_empty() {
            return Err(CoreError::Config("llm.api_key is required".into()));
        }
        if self.llm.model_id.is_empty() {
            return Err(CoreError::Config("llm.model_id is required".into()));
        }
        if self.speech.stt_api_key.is_empty() {
            return Err(CoreError::Config("speech.stt_api_key is required".into()));
        }
        if self.speech.tts_api_key.is_empty() {
            return Err(CoreError::Config("speech.tts_api_key is required".into()));
        }
        Ok(())
    }

    /// Validate that transfer-to-human has what it needs. Called only
    /// when a deployment actually wires the transfer tool in.
    pub fn validate_transfer(&self) -> Result<(), CoreError> {
        if self.transfer.owner_phone_number.is_empty() {
            return Err(CoreError::Config(
                "transfer.owner_phone_number is required to enable transferToHuman".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_settings() -> Settings {
        Settings {
            telephony: TelephonyConfig {
                account_sid: "AC123".into(),
                auth_token: "secret".into(),
                phone_number: "+15550000".into(),
                public_base_url: "https://example.com".into(),
            },
            speech: SpeechConfig {
                stt_api_key: "stt-key".into(),
                stt_model_id: "stt-1".into(),
                tts_api_key: "tts-key".into(),
                tts_model_id: "tts-1".into(),
                sample_rate_hz: 8_000,
            },
            llm: LlmConfig {
                api_key: "llm-key".into(),
                model_id: "gpt-test".into(),
                base_url: None,
            },
            transfer: TransferConfig {
                owner_phone_number: String::new(),
            },
            server: ServerConfig { listen_port: 9000 },
        }
    }

    #[test]
    fn from_toml_parses_nested_sections() {
        let raw = r#"
            [telephony]
            account_sid = "AC123"
            auth_token = "secret"
            phone_number = "+15550000"
            public_base_url = "https://example.com"

            [llm]
            api_key = "llm-key"
            model_id = "gpt-test"
        "#;
        let settings = Settings::from_toml(raw).unwrap();
        assert_eq!(settings.telephony.account_sid, "AC123");
        assert_eq!(settings.llm.model_id, "gpt-test");
    }

    #[test]
    fn from_toml_rejects_malformed_input() {
        let result = Settings::from_toml("not = [valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn validate_passes_for_complete_settings() {
        assert!(complete_settings().validate().is_ok());
    }

    #[test]
    fn validate_reports_first_missing_required_field() {
        let mut settings = complete_settings();
        settings.telephony.account_sid = String::new();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("account_sid"));
    }

    #[test]
    fn validate_transfer_requires_owner_phone_number() {
        let settings = complete_settings();
        assert!(settings.validate_transfer().is_err());
    }

    #[test]
    fn validate_transfer_passes_once_owner_phone_number_set() {
        let mut settings = complete_settings();
        settings.transfer.owner_phone_number = "+15551234".into();
        assert!(settings.validate_transfer().is_ok());
    }

    #[test]
    fn default_server_config_has_a_sane_listen_port() {
        assert_eq!(ServerConfig::default().listen_port, 8080);
    }
}
