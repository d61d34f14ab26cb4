use std::fmt::Debug;

/// The model used when none is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// The endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Builder for [`OpenRouterConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenRouterConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    system_prompt: Option<String>,
    referer: Option<String>,
    title: Option<String>,
}

impl OpenRouterConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            system_prompt: None,
            referer: None,
            title: None,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the persona instructions prepended to every request.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the `HTTP-Referer` attribution header.
    #[inline]
    pub fn with_referer<S: Into<String>>(mut self, referer: S) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Sets the `X-Title` attribution header.
    #[inline]
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenRouterConfig {
        OpenRouterConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            system_prompt: self.system_prompt,
            referer: self.referer,
            title: self.title,
        }
    }
}

impl Debug for OpenRouterConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Configuration for the OpenRouter provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenRouterConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) system_prompt: Option<String>,
    pub(crate) referer: Option<String>,
    pub(crate) title: Option<String>,
}

impl OpenRouterConfig {
    /// Returns the model identifier sent upstream.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the endpoint base URL, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}
