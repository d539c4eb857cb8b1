use crate::*;

use std::collections::HashSet;

/// Slot role used for the install-time prefetch cache.
pub const PREFETCH_SLOT: &str = "prefetch";

/// Lifecycle phase of a single worker version. `Redundant` is reached when
/// install fails; such a worker never becomes activatable. A previously
/// `Active` version is superseded implicitly when a newer version's
/// activation evicts its slots from shared storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    Redundant,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Uninstalled => "uninstalled",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Active => "active",
            Phase::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// The cache lifecycle controller. Owns the configuration of one worker
/// version plus handles to the persisted cache storage and the network, and
/// drives `Uninstalled -> Installing -> Installed -> Activating -> Active`.
///
/// Lifecycle entry points are plain async functions; keeping the execution
/// context alive until they settle is the host shim's job.
pub struct ServiceWorker<C: Caches, N: Network> {
    config: CacheConfig,
    caches: C,
    network: N,
    phase: Phase,
}

impl<C: Caches, N: Network> ServiceWorker<C, N> {
    pub fn new(config: CacheConfig, caches: C, network: N) -> Self {
        Self {
            config,
            caches,
            network,
            phase: Phase::Uninstalled,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Synchronous exclusion check, usable by the host shim before it decides
    /// whether to take over the request at all.
    pub fn is_excluded(&self, url: &str) -> bool {
        self.config.is_excluded(url)
    }

    /// Prefetch the whole manifest into this version's prefetch slot. Fails as
    /// a whole if any single fetch-or-store fails; entries already written are
    /// left in place (no rollback). A failed worker ends up `Redundant` and
    /// never activates.
    pub async fn install(&mut self) -> Result {
        self.expect(Phase::Uninstalled)?;
        self.phase = Phase::Installing;
        match self.prefetch().await {
            Ok(()) => {
                info!("all resources have been fetched and cached");
                self.phase = Phase::Installed;
                Ok(())
            }
            Err(e) => {
                error!("prefetching failed: {e}");
                self.phase = Phase::Redundant;
                Err(e)
            }
        }
    }

    async fn prefetch(&self) -> Result {
        let urls = self.config.manifest_urls();
        info!("handling install event, resources to prefetch: {urls:?}");
        let slot = self
            .config
            .slot_name(PREFETCH_SLOT)
            .ok_or_else(|| e!("no {PREFETCH_SLOT} slot configured"))?;
        let cache = self.caches.open(slot).await?;
        for url in urls {
            // no-cors so that hosts without CORS support still prefetch;
            // their responses come back opaque and are stored uninspected
            let request = Request::get(url).no_cors();
            let response = self
                .network
                .fetch(request.duplicate())
                .await
                .map_err(|e| Error::Prefetch {
                    url: url.clone(),
                    source: Box::new(e),
                })?;
            cache.put(request, response).await?;
        }
        Ok(())
    }

    /// Evict every persisted cache identifier that does not belong to this
    /// version. Deletions run concurrently and independently; an individual
    /// failure is logged and neither blocks the others nor fails activation.
    /// Returns the stale identifiers that were attempted, so re-running with
    /// an unchanged persisted set returns an empty list.
    pub async fn activate(&mut self) -> Result<Vec<String>> {
        if !matches!(self.phase, Phase::Installed | Phase::Active) {
            return Err(Error::Phase {
                expected: Phase::Installed,
                actual: self.phase,
            });
        }
        let resume = self.phase;
        self.phase = Phase::Activating;

        let persisted = match self.caches.list().await {
            Ok(names) => names,
            Err(e) => {
                self.phase = resume;
                return Err(e);
            }
        };
        let current: HashSet<&str> = self.config.current_identifiers().collect();
        let stale: Vec<String> = persisted
            .into_iter()
            .filter(|name| !current.contains(name.as_str()))
            .collect();

        let caches = &self.caches;
        let deletions = stale.iter().map(|name| async move {
            match caches.delete(name).await {
                Ok(true) => info!("deleting out of date cache: {name}"),
                Ok(false) => debug!("out of date cache {name} already gone"),
                Err(e) => warn!("failed to delete out of date cache {name}: {e}"),
            }
        });
        futures::future::join_all(deletions).await;

        self.phase = Phase::Active;
        Ok(stale)
    }

    /// Intercept one page request. Excluded URLs bypass the cache entirely; a
    /// hit is served without touching the network; a miss costs exactly one
    /// network fetch and, on success, one cache write. Lookup and network
    /// failures propagate to the page as errors, a failed write after a
    /// successful fetch is only logged and the live response still served.
    pub async fn handle_fetch(&self, request: Request) -> Result<FetchOutcome> {
        self.expect(Phase::Active)?;
        let url = request.url().to_owned();
        debug!("handling fetch event for {url}");

        if self.config.is_excluded(&url) {
            debug!("{url} is excluded, passing through to the network");
            return Ok(FetchOutcome::Bypass);
        }

        let slot = self
            .config
            .slot_name(PREFETCH_SLOT)
            .ok_or_else(|| e!("no {PREFETCH_SLOT} slot configured"))?;
        let cache = self.caches.open(slot).await?;

        if let Some(stored) = cache.lookup(&request.key()).await? {
            debug!("found response for {url} in cache");
            return Ok(FetchOutcome::Respond(stored));
        }

        debug!("no response for {url} found in cache, fetching from network");
        let response = self.network.fetch(request.duplicate()).await?;
        if let Err(e) = cache.put(request, response.duplicate()).await {
            warn!("failed to cache response for {url}: {e}");
        }
        Ok(FetchOutcome::Respond(response))
    }

    fn expect(&self, expected: Phase) -> Result {
        if self.phase != expected {
            return Err(Error::Phase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }
}
