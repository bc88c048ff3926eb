//! Declarative descriptors for every supported backend.
//!
//! The mapping from provider name to behavior is a sealed enum built at
//! compile time, not a runtime-mutable registry. Adding a backend means
//! adding a `ProviderKind` variant and one descriptor arm.

use std::env;

use crate::error::AiError;

/// Which request/response wire shape a backend speaks.
///
/// `ChatCompletions`: system/user/assistant entries in one `messages` array,
/// text at `choices[0].message.content`. `Messages`: a top-level `system`
/// field plus user/assistant `messages`, text at `content[0].text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStyle {
    ChatCompletions,
    Messages,
}

/// Where the endpoint URL comes from.
///
/// Env-derived variants resolve at adapter construction; a missing required
/// value is a `config`-kind error raised before any network call.
#[derive(Debug, Clone)]
pub enum UrlSource {
    Static(&'static str),
    /// Base URL from an env var (with optional default), plus a fixed path.
    Env {
        var: &'static str,
        default: Option<&'static str>,
        path: &'static str,
    },
    /// Azure: endpoint + deployment + api-version, all from the environment.
    Azure,
}

impl UrlSource {
    /// Resolve to a concrete URL, or a config error naming what is missing.
    pub fn resolve(&self) -> Result<String, AiError> {
        match self {
            UrlSource::Static(url) => Ok((*url).to_string()),
            UrlSource::Env { var, default, path } => {
                let base = match non_empty_env(var) {
                    Some(v) => v,
                    None => match default {
                        Some(d) => (*d).to_string(),
                        None => {
                            return Err(AiError::config(format!(
                                "Missing required environment variable {var}"
                            )));
                        }
                    },
                };
                Ok(format!("{}{path}", base.trim_end_matches('/')))
            }
            UrlSource::Azure => {
                let endpoint = non_empty_env("AZURE_OPENAI_ENDPOINT").ok_or_else(|| {
                    AiError::config("Missing required environment variable AZURE_OPENAI_ENDPOINT")
                })?;
                let deployment = non_empty_env("AZURE_OPENAI_DEPLOYMENT").ok_or_else(|| {
                    AiError::config("Missing required environment variable AZURE_OPENAI_DEPLOYMENT")
                })?;
                let api_version = non_empty_env("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| "2024-10-21".to_string());
                Ok(format!(
                    "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                    endpoint.trim_end_matches('/')
                ))
            }
        }
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// How the credential travels. Always a header, never the URL or body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Vendor-named header, e.g. `x-api-key` or `api-key`.
    Header(&'static str),
    /// Local backends that take no credential.
    None,
}

/// Where the credential comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Required API key env var.
    ApiKeyEnv(&'static str),
    /// Optional key (local backends run without one).
    OptionalEnv(&'static str),
    /// API key env var first, OAuth token cache second. `login_hint` names
    /// the command that fills the cache.
    EnvOrOauth {
        var: &'static str,
        login_hint: &'static str,
    },
}

/// Everything the generic HTTP adapter needs to speak one vendor's dialect.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub style: RequestStyle,
    pub url: UrlSource,
    pub auth: AuthStyle,
    pub credentials: CredentialSource,
    /// Vendors disagree on the max-output-tokens field name.
    pub max_tokens_field: &'static str,
    /// Extra vendor-specific headers sent with every request.
    pub extra_headers: &'static [(&'static str, &'static str)],
    /// Model names that need a vendor prefix (applied only when absent).
    pub model_prefix: Option<&'static str>,
    /// Subscription-OAuth backends require this exact system message; any
    /// caller-supplied system content is relocated into the first user
    /// message and cannot override it.
    pub pinned_system: Option<&'static str>,
    /// Model used when the caller gives only a provider name.
    pub default_model: &'static str,
}

/// Fixed system message required by the subscription-OAuth Anthropic API.
pub const CLAUDE_OAUTH_SYSTEM: &str = "You are Claude Code, Anthropic's official CLI for Claude.";

/// Every supported backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    AzureOpenAi,
    Anthropic,
    ClaudePro,
    Gemini,
    Mistral,
    Groq,
    DeepSeek,
    OpenRouter,
    Xai,
    Together,
    Fireworks,
    Perplexity,
    Cerebras,
    SambaNova,
    Moonshot,
    Zhipu,
    Qwen,
    GithubModels,
    Nvidia,
    DeepInfra,
    Ollama,
    LmStudio,
    Custom,
}

impl ProviderKind {
    /// All backends, in display order.
    pub const ALL: &'static [ProviderKind] = &[
        ProviderKind::OpenAi,
        ProviderKind::AzureOpenAi,
        ProviderKind::Anthropic,
        ProviderKind::ClaudePro,
        ProviderKind::Gemini,
        ProviderKind::Mistral,
        ProviderKind::Groq,
        ProviderKind::DeepSeek,
        ProviderKind::OpenRouter,
        ProviderKind::Xai,
        ProviderKind::Together,
        ProviderKind::Fireworks,
        ProviderKind::Perplexity,
        ProviderKind::Cerebras,
        ProviderKind::SambaNova,
        ProviderKind::Moonshot,
        ProviderKind::Zhipu,
        ProviderKind::Qwen,
        ProviderKind::GithubModels,
        ProviderKind::Nvidia,
        ProviderKind::DeepInfra,
        ProviderKind::Ollama,
        ProviderKind::LmStudio,
        ProviderKind::Custom,
    ];

    /// Look up a backend by its CLI name.
    pub fn from_name(name: &str) -> Result<Self, AiError> {
        let found = Self::ALL
            .iter()
            .find(|k| k.descriptor().name == name)
            .copied();
        found.ok_or_else(|| {
            AiError::config(format!(
                "Unknown provider '{name}'. Supported: {}",
                Self::ALL
                    .iter()
                    .map(|k| k.descriptor().name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    /// The declarative description of this backend's dialect.
    pub fn descriptor(&self) -> ProviderDescriptor {
        // Most backends are OpenAI-compatible; this default covers them and
        // each arm overrides only what differs.
        let chat = |name, url, key_env, default_model| ProviderDescriptor {
            name,
            style: RequestStyle::ChatCompletions,
            url: UrlSource::Static(url),
            auth: AuthStyle::Bearer,
            credentials: CredentialSource::ApiKeyEnv(key_env),
            max_tokens_field: "max_tokens",
            extra_headers: &[],
            model_prefix: None,
            pinned_system: None,
            default_model,
        };

        match self {
            ProviderKind::OpenAi => ProviderDescriptor {
                max_tokens_field: "max_completion_tokens",
                ..chat(
                    "openai",
                    "https://api.openai.com/v1/chat/completions",
                    "OPENAI_API_KEY",
                    "gpt-4o-mini",
                )
            },
            ProviderKind::AzureOpenAi => ProviderDescriptor {
                url: UrlSource::Azure,
                auth: AuthStyle::Header("api-key"),
                max_tokens_field: "max_completion_tokens",
                ..chat("azure", "", "AZURE_OPENAI_API_KEY", "gpt-4o-mini")
            },
            ProviderKind::Anthropic => ProviderDescriptor {
                style: RequestStyle::Messages,
                auth: AuthStyle::Header("x-api-key"),
                extra_headers: &[("anthropic-version", "2023-06-01")],
                ..chat(
                    "anthropic",
                    "https://api.anthropic.com/v1/messages",
                    "ANTHROPIC_API_KEY",
                    "claude-sonnet-4-20250514",
                )
            },
            ProviderKind::ClaudePro => ProviderDescriptor {
                style: RequestStyle::Messages,
                credentials: CredentialSource::EnvOrOauth {
                    var: "ANTHROPIC_API_KEY",
                    login_hint: "grapheus auth login claude",
                },
                extra_headers: &[
                    ("anthropic-version", "2023-06-01"),
                    ("anthropic-beta", "oauth-2025-04-20"),
                ],
                pinned_system: Some(CLAUDE_OAUTH_SYSTEM),
                ..chat(
                    "claude-pro",
                    "https://api.anthropic.com/v1/messages",
                    "ANTHROPIC_API_KEY",
                    "claude-sonnet-4-20250514",
                )
            },
            ProviderKind::Gemini => chat(
                "gemini",
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                "GEMINI_API_KEY",
                "gemini-2.0-flash",
            ),
            ProviderKind::Mistral => chat(
                "mistral",
                "https://api.mistral.ai/v1/chat/completions",
                "MISTRAL_API_KEY",
                "mistral-small-latest",
            ),
            ProviderKind::Groq => chat(
                "groq",
                "https://api.groq.com/openai/v1/chat/completions",
                "GROQ_API_KEY",
                "llama-3.3-70b-versatile",
            ),
            ProviderKind::DeepSeek => chat(
                "deepseek",
                "https://api.deepseek.com/chat/completions",
                "DEEPSEEK_API_KEY",
                "deepseek-chat",
            ),
            ProviderKind::OpenRouter => ProviderDescriptor {
                extra_headers: &[
                    ("HTTP-Referer", "https://github.com/jacksnxly/grapheus"),
                    ("X-Title", "grapheus"),
                ],
                ..chat(
                    "openrouter",
                    "https://openrouter.ai/api/v1/chat/completions",
                    "OPENROUTER_API_KEY",
                    "openai/gpt-4o-mini",
                )
            },
            ProviderKind::Xai => chat(
                "xai",
                "https://api.x.ai/v1/chat/completions",
                "XAI_API_KEY",
                "grok-3-mini",
            ),
            ProviderKind::Together => chat(
                "together",
                "https://api.together.xyz/v1/chat/completions",
                "TOGETHER_API_KEY",
                "meta-llama/Llama-3.3-70B-Instruct-Turbo",
            ),
            ProviderKind::Fireworks => chat(
                "fireworks",
                "https://api.fireworks.ai/inference/v1/chat/completions",
                "FIREWORKS_API_KEY",
                "accounts/fireworks/models/llama-v3p3-70b-instruct",
            ),
            ProviderKind::Perplexity => chat(
                "perplexity",
                "https://api.perplexity.ai/chat/completions",
                "PERPLEXITY_API_KEY",
                "sonar",
            ),
            ProviderKind::Cerebras => chat(
                "cerebras",
                "https://api.cerebras.ai/v1/chat/completions",
                "CEREBRAS_API_KEY",
                "llama-3.3-70b",
            ),
            ProviderKind::SambaNova => chat(
                "sambanova",
                "https://api.sambanova.ai/v1/chat/completions",
                "SAMBANOVA_API_KEY",
                "Meta-Llama-3.3-70B-Instruct",
            ),
            ProviderKind::Moonshot => chat(
                "moonshot",
                "https://api.moonshot.cn/v1/chat/completions",
                "MOONSHOT_API_KEY",
                "moonshot-v1-8k",
            ),
            ProviderKind::Zhipu => chat(
                "zhipu",
                "https://open.bigmodel.cn/api/paas/v4/chat/completions",
                "ZHIPU_API_KEY",
                "glm-4-flash",
            ),
            ProviderKind::Qwen => chat(
                "qwen",
                "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions",
                "DASHSCOPE_API_KEY",
                "qwen-plus",
            ),
            ProviderKind::GithubModels => ProviderDescriptor {
                model_prefix: Some("openai/"),
                ..chat(
                    "github",
                    "https://models.github.ai/inference/chat/completions",
                    "GITHUB_TOKEN",
                    "gpt-4o-mini",
                )
            },
            ProviderKind::Nvidia => chat(
                "nvidia",
                "https://integrate.api.nvidia.com/v1/chat/completions",
                "NVIDIA_API_KEY",
                "meta/llama-3.3-70b-instruct",
            ),
            ProviderKind::DeepInfra => chat(
                "deepinfra",
                "https://api.deepinfra.com/v1/openai/chat/completions",
                "DEEPINFRA_API_KEY",
                "meta-llama/Llama-3.3-70B-Instruct",
            ),
            ProviderKind::Ollama => ProviderDescriptor {
                url: UrlSource::Env {
                    var: "OLLAMA_HOST",
                    default: Some("http://localhost:11434"),
                    path: "/v1/chat/completions",
                },
                auth: AuthStyle::None,
                credentials: CredentialSource::OptionalEnv("OLLAMA_API_KEY"),
                ..chat("ollama", "", "OLLAMA_API_KEY", "llama3.1")
            },
            ProviderKind::LmStudio => ProviderDescriptor {
                url: UrlSource::Env {
                    var: "LMSTUDIO_HOST",
                    default: Some("http://localhost:1234"),
                    path: "/v1/chat/completions",
                },
                auth: AuthStyle::None,
                credentials: CredentialSource::OptionalEnv("LMSTUDIO_API_KEY"),
                ..chat("lmstudio", "", "LMSTUDIO_API_KEY", "local-model")
            },
            ProviderKind::Custom => ProviderDescriptor {
                url: UrlSource::Env {
                    var: "GRAPHEUS_BASE_URL",
                    default: None,
                    path: "/chat/completions",
                },
                ..chat("custom", "", "GRAPHEUS_API_KEY", "default")
            },
        }
    }
}
