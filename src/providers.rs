//! Built-in presets for OpenAI-compatible endpoints that serve Kimi K2.
//!
//! Each preset defines the base URL, the environment variable holding the API
//! key, and the model id the endpoint uses for Kimi K2. Users pick a preset by
//! name in their config and override individual fields as needed.

/// Preset used when the config names none.
pub const DEFAULT_PRESET: &str = "groq";

#[derive(Debug, Clone)]
pub struct UpstreamPreset {
    pub name: &'static str,
    pub base_url: &'static str,
    pub default_api_key_env: &'static str,
    pub model: &'static str,
}

const PRESETS: &[UpstreamPreset] = &[
    UpstreamPreset {
        name: "groq",
        base_url: "https://api.groq.com/openai/v1",
        default_api_key_env: "GROQ_API_KEY",
        model: "moonshotai/kimi-k2-instruct",
    },
    UpstreamPreset {
        name: "moonshot",
        base_url: "https://api.moonshot.ai/v1",
        default_api_key_env: "MOONSHOT_API_KEY",
        model: "kimi-k2-0711-preview",
    },
    UpstreamPreset {
        name: "openrouter",
        base_url: "https://openrouter.ai/api/v1",
        default_api_key_env: "OPENROUTER_API_KEY",
        model: "moonshotai/kimi-k2",
    },
    UpstreamPreset {
        name: "together",
        base_url: "https://api.together.xyz/v1",
        default_api_key_env: "TOGETHER_API_KEY",
        model: "moonshotai/Kimi-K2-Instruct",
    },
];

impl UpstreamPreset {
    #[must_use]
    pub fn from_name(name: &str) -> Option<&'static UpstreamPreset> {
        let name = name.to_lowercase();
        PRESETS.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn all() -> &'static [UpstreamPreset] {
        PRESETS
    }

    #[must_use]
    pub fn known_names() -> String {
        Self::all().iter().map(|p| p.name).collect::<Vec<_>>().join(", ")
    }
}
