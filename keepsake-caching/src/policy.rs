//! Caching policy for the class cache pattern

use keepsake_config::PatternConfig;

/// Which methods have their results cached.
///
/// Method names are lower-cased when stored so they match the lower-cased
/// names the interceptor passes to [`should_cache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternOptions {
    cache_by_default: bool,
    cache_methods: Vec<String>,
    non_cache_methods: Vec<String>,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            cache_by_default: true,
            cache_methods: Vec::new(),
            non_cache_methods: Vec::new(),
        }
    }
}

impl PatternOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_by_default(&self) -> bool {
        self.cache_by_default
    }

    pub fn cache_methods(&self) -> &[String] {
        &self.cache_methods
    }

    pub fn non_cache_methods(&self) -> &[String] {
        &self.non_cache_methods
    }

    pub fn set_cache_by_default(&mut self, cache_by_default: bool) -> &mut Self {
        self.cache_by_default = cache_by_default;
        self
    }

    pub fn set_cache_methods<I, S>(&mut self, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cache_methods = normalize(methods);
        self
    }

    pub fn set_non_cache_methods<I, S>(&mut self, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.non_cache_methods = normalize(methods);
        self
    }

    /// Builder form of [`set_cache_by_default`](Self::set_cache_by_default)
    pub fn with_cache_by_default(mut self, cache_by_default: bool) -> Self {
        self.set_cache_by_default(cache_by_default);
        self
    }

    /// Builder form of [`set_cache_methods`](Self::set_cache_methods)
    pub fn with_cache_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_cache_methods(methods);
        self
    }

    /// Builder form of [`set_non_cache_methods`](Self::set_non_cache_methods)
    pub fn with_non_cache_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_non_cache_methods(methods);
        self
    }
}

impl From<&PatternConfig> for PatternOptions {
    fn from(config: &PatternConfig) -> Self {
        Self::new()
            .with_cache_by_default(config.cache_by_default)
            .with_cache_methods(&config.class_cache_methods)
            .with_non_cache_methods(&config.class_non_cache_methods)
    }
}

/// Decide whether calls to `method` are cached.
///
/// Comparison is exact; callers pass the lower-cased method name.
pub fn should_cache(method: &str, options: &PatternOptions) -> bool {
    if options.cache_by_default {
        !options.non_cache_methods.iter().any(|m| m == method)
    } else {
        options.cache_methods.iter().any(|m| m == method)
    }
}

fn normalize<I, S>(methods: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    methods
        .into_iter()
        .map(|method| method.as_ref().to_lowercase())
        .collect()
}
