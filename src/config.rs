use std::env;

pub const STORE_URL_PLACEHOLDER: &str = "your-supabase-url";
pub const STORE_KEY_PLACEHOLDER: &str = "your-supabase-anon-key";
pub const OPENAI_KEY_PLACEHOLDER: &str = "your-openai-api-key";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's key
    const KEY_NAME: &'static str;

    /// Value used when the key is absent. Calls made with it fail at request time, not at startup.
    const PLACEHOLDER: &'static str;

    /// Find the key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        // First try to load .env file (silently fail if not found)
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME).ok().filter(|v| !v.trim().is_empty())
    }

    fn find_key_or_placeholder() -> String {
        Self::find_key().unwrap_or_else(|| {
            tracing::warn!(key = Self::KEY_NAME, "environment variable not set, using placeholder");
            Self::PLACEHOLDER.to_string()
        })
    }
}

/// Store URL and anonymous key for the hosted backend.
pub struct StoreUrl;
pub struct StoreAnonKey;
pub struct OpenAIKey;

impl KeyFromEnv for StoreUrl {
    const KEY_NAME: &'static str = "SUPABASE_URL";
    const PLACEHOLDER: &'static str = STORE_URL_PLACEHOLDER;
}

impl KeyFromEnv for StoreAnonKey {
    const KEY_NAME: &'static str = "SUPABASE_ANON_KEY";
    const PLACEHOLDER: &'static str = STORE_KEY_PLACEHOLDER;
}

impl KeyFromEnv for OpenAIKey {
    const KEY_NAME: &'static str = "OPENAI_API_KEY";
    const PLACEHOLDER: &'static str = OPENAI_KEY_PLACEHOLDER;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store_url: String,
    pub store_anon_key: String,
    pub openai_api_key: String,
    pub openai_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: STORE_URL_PLACEHOLDER.to_string(),
            store_anon_key: STORE_KEY_PLACEHOLDER.to_string(),
            openai_api_key: OPENAI_KEY_PLACEHOLDER.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment (and `.env`). Never fails; missing values become placeholders.
    pub fn from_env() -> Self {
        let openai_model = env::var("OPENAI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        Self {
            store_url: StoreUrl::find_key_or_placeholder(),
            store_anon_key: StoreAnonKey::find_key_or_placeholder(),
            openai_api_key: OpenAIKey::find_key_or_placeholder(),
            openai_model,
        }
    }

    /// True when any credential is still a placeholder.
    pub fn has_placeholders(&self) -> bool {
        self.store_url == STORE_URL_PLACEHOLDER
            || self.store_anon_key == STORE_KEY_PLACEHOLDER
            || self.openai_api_key == OPENAI_KEY_PLACEHOLDER
    }
}
