use crate::*;

/// Cache slot identifiers follow the original `<base>-v<version>` convention
/// so that bumping the version makes every previous identifier stale.
fn slot_identifier(base: &str, version: u32) -> String {
    format!("{base}-v{version}")
}

/// Configuration of a single service worker version: the cache version, the
/// named cache slots, the prefetch manifest and the interception exclusions.
///
/// Passed into [`ServiceWorker`] at construction instead of living in module
/// globals, so several versions can coexist in one process (and one test).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    version: u32,
    slots: Vec<(String, String)>,
    manifest: Vec<String>,
    exclusions: Vec<String>,
}

impl CacheConfig {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            slots: vec![],
            manifest: vec![],
            exclusions: vec![],
        }
    }

    /// Register a named cache slot. The persisted identifier is derived from
    /// the base name and the version, e.g. `slot("prefetch", "window-cache")`
    /// at version 3 persists as `window-cache-v3`.
    pub fn slot(mut self, role: &str, base: &str) -> Self {
        self.slots
            .push((role.to_owned(), slot_identifier(base, self.version)));
        self
    }

    pub fn manifest(mut self, urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.manifest.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Requests to this exact URL are never intercepted or cached.
    pub fn exclude(mut self, url: impl Into<String>) -> Self {
        self.exclusions.push(url.into());
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Persisted identifier for a slot role, if configured.
    pub fn slot_name(&self, role: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|(r, _)| r == role)
            .map(|(_, name)| name.as_str())
    }

    /// All identifiers that are current for this version. Anything persisted
    /// outside this set is stale and gets evicted on activation.
    pub fn current_identifiers(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(_, name)| name.as_str())
    }

    pub fn manifest_urls(&self) -> &[String] {
        &self.manifest
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclusions.iter().any(|e| e == url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_identifiers_are_version_qualified() {
        let config = CacheConfig::new(3).slot("prefetch", "window-cache");
        assert_eq!(config.slot_name("prefetch"), Some("window-cache-v3"));
        assert_eq!(config.slot_name("runtime"), None);
        assert_eq!(
            config.current_identifiers().collect::<Vec<_>>(),
            vec!["window-cache-v3"]
        );
    }

    #[test]
    fn exclusions_match_exact_urls_only() {
        let config =
            CacheConfig::new(1).exclude("https://www.google-analytics.com/analytics.js");
        assert!(config.is_excluded("https://www.google-analytics.com/analytics.js"));
        assert!(!config.is_excluded("https://www.google-analytics.com/analytics.js?v=2"));
    }
}
