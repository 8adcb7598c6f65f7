//! Site registry and hostname lookup.
//!
//! Registrations are serialized by one mutex; lookups read an immutable
//! snapshot published through `ArcSwap`, so a site's hostnames appear and
//! disappear together.
//!
//! ```text
//! find_site_by_url("http://www.test.com/x")
//!   1. exact hostnames           www.test.com -> site
//!   2. wildcard cache            www.test.com -> site id (validated)
//!   3. wildcard patterns         *.test.com   -> site, cached
//! ```


use super::{Environment, HostPattern, Site, SiteError, host_of};
use crate::repository::ContentRepository;
use crate::{debug, log};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Registration events delivered by whatever hosts the sites.
pub enum SiteEvent {
    SiteAppeared(Arc<Site>),
    SiteDisappeared(String),
    RepositoryAppeared {
        site: String,
        repository: Arc<dyn ContentRepository>,
    },
    RepositoryDisappeared(String),
}

impl fmt::Debug for SiteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SiteAppeared(site) => write!(f, "SiteAppeared({})", site.identifier()),
            Self::SiteDisappeared(id) => write!(f, "SiteDisappeared({id})"),
            Self::RepositoryAppeared { site, .. } => write!(f, "RepositoryAppeared({site})"),
            Self::RepositoryDisappeared(site) => write!(f, "RepositoryDisappeared({site})"),
        }
    }
}

/// Observer of site registrations.
pub trait SiteListener: Send + Sync {
    fn site_appeared(&self, _site: &Arc<Site>) {}

    fn site_disappeared(&self, _site: &Arc<Site>) {}
}

/// Published lookup tables.
#[derive(Clone, Default)]
struct Snapshot {
    sites: FxHashMap<String, Arc<Site>>,
    exact: FxHashMap<String, Arc<Site>>,
    wildcards: Vec<(HostPattern, Arc<Site>)>,
}

impl Snapshot {
    fn owner(&self, pattern: &HostPattern) -> Option<&Arc<Site>> {
        match pattern {
            HostPattern::Exact(host) => self.exact.get(host),
            HostPattern::Wildcard { .. } => self
                .wildcards
                .iter()
                .find(|(p, _)| p == pattern)
                .map(|(_, site)| site),
        }
    }
}

/// Repositories waiting for their site, guarded by the registration lock.
#[derive(Default)]
struct Registry {
    pending: FxHashMap<String, Arc<dyn ContentRepository>>,
}

/// Registry of sites, resolving request hosts to sites.
pub struct SiteManager {
    environment: Environment,
    registry: Mutex<Registry>,
    snapshot: ArcSwap<Snapshot>,
    wildcard_hits: DashMap<String, String>,
    listeners: RwLock<Vec<Arc<dyn SiteListener>>>,
}

impl Default for SiteManager {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

impl SiteManager {
    /// Manager binding only hostnames of `environment`.
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            registry: Mutex::new(Registry::default()),
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            wildcard_hits: DashMap::new(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn add_listener(&self, listener: Arc<dyn SiteListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SiteListener>) {
        self.listeners.write().retain(|l| !Arc::ptr_eq(l, listener));
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Site serving the host of `url` (a full url or a bare hostname).
    pub fn find_site_by_url(&self, url: &str) -> Option<Arc<Site>> {
        let host = host_of(url).to_ascii_lowercase();
        let snapshot = self.snapshot.load();

        if let Some(site) = snapshot.exact.get(&host) {
            return Some(Arc::clone(site));
        }

        if let Some(id) = self.wildcard_hits.get(&host)
            && let Some(site) = snapshot.sites.get(id.value())
        {
            return Some(Arc::clone(site));
        }

        let (_, site) = snapshot
            .wildcards
            .iter()
            .find(|(pattern, _)| pattern.matches(&host))?;
        self.wildcard_hits
            .insert(host, site.identifier().to_string());
        Some(Arc::clone(site))
    }

    pub fn site(&self, identifier: &str) -> Option<Arc<Site>> {
        self.snapshot.load().sites.get(identifier).cloned()
    }

    /// Registered sites, sorted by identifier.
    pub fn sites(&self) -> Vec<Arc<Site>> {
        let mut sites: Vec<_> = self.snapshot.load().sites.values().cloned().collect();
        sites.sort_by(|a, b| a.identifier().cmp(b.identifier()));
        sites
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Dispatch a registration event.
    pub fn handle(&self, event: SiteEvent) -> Result<(), SiteError> {
        debug!("site"; "{:?}", event);
        match event {
            SiteEvent::SiteAppeared(site) => self.add_site(site),
            SiteEvent::SiteDisappeared(id) => self.remove_site(&id).map(|_| ()),
            SiteEvent::RepositoryAppeared { site, repository } => {
                self.add_content_repository(&site, repository)
            }
            SiteEvent::RepositoryDisappeared(site) => {
                self.remove_content_repository(&site).map(|_| ())
            }
        }
    }

    /// Register a site and publish its hostnames.
    ///
    /// Hostnames already bound to another site are logged and skipped. A
    /// waiting repository is attached, and autostart sites are started;
    /// start failures are only logged.
    pub fn add_site(&self, site: Arc<Site>) -> Result<(), SiteError> {
        let mut registry = self.registry.lock();
        let id = site.identifier().to_string();

        let current = self.snapshot.load_full();
        if current.sites.contains_key(&id) {
            return Err(SiteError::Duplicate(id));
        }

        let mut next = Snapshot::clone(&current);
        next.sites.insert(id.clone(), Arc::clone(&site));
        for hostname in site.hostnames() {
            let pattern = hostname.pattern();
            if hostname.environment() != self.environment {
                debug!("site"; "{}: skipping {} hostname {}", id, hostname.environment(), pattern);
                continue;
            }
            if let Some(owner) = next.owner(pattern) {
                if owner.identifier() != id {
                    let taken = SiteError::HostnameTaken {
                        hostname: pattern.to_string(),
                        owner: owner.identifier().to_string(),
                    };
                    log!("error"; "site {}: {}", id, taken);
                }
                continue;
            }
            match pattern {
                HostPattern::Exact(host) => {
                    next.exact.insert(host.clone(), Arc::clone(&site));
                }
                HostPattern::Wildcard { .. } => {
                    next.wildcards.push((pattern.clone(), Arc::clone(&site)));
                }
            }
        }
        self.snapshot.store(Arc::new(next));
        log!("site"; "registered {}", id);

        if let Some(repository) = registry.pending.remove(&id)
            && let Err(e) = site.set_content_repository(Arc::clone(&repository))
        {
            log!("error"; "site {}: cannot attach repository: {}", id, e);
            registry.pending.insert(id.clone(), repository);
        }

        if site.autostart() {
            match site.start() {
                Ok(()) => debug!("site"; "started {}", id),
                Err(e) => log!("error"; "cannot start site {}: {}", id, e),
            }
        }
        drop(registry);

        for listener in self.listeners.read().iter() {
            listener.site_appeared(&site);
        }
        Ok(())
    }

    /// Withdraw a site: its hostnames disappear, it is stopped and its
    /// repository disconnected. The repository waits for the site to return.
    pub fn remove_site(&self, identifier: &str) -> Result<Arc<Site>, SiteError> {
        let mut registry = self.registry.lock();
        let current = self.snapshot.load_full();
        let site = current
            .sites
            .get(identifier)
            .cloned()
            .ok_or_else(|| SiteError::Unknown(identifier.to_string()))?;

        let mut next = Snapshot::clone(&current);
        next.sites.remove(identifier);
        next.exact.retain(|_, s| s.identifier() != identifier);
        next.wildcards.retain(|(_, s)| s.identifier() != identifier);
        self.snapshot.store(Arc::new(next));
        self.wildcard_hits.retain(|_, id| id != identifier);

        site.stop();
        match site.take_content_repository() {
            Ok(Some(repository)) => {
                registry.pending.insert(identifier.to_string(), repository);
            }
            Ok(None) => {}
            Err(e) => log!("error"; "site {}: cannot disconnect repository: {}", identifier, e),
        }
        log!("site"; "unregistered {}", identifier);
        drop(registry);

        for listener in self.listeners.read().iter() {
            listener.site_disappeared(&site);
        }
        Ok(site)
    }

    /// Attach a repository to a site, now or as soon as the site appears.
    ///
    /// Rejected when the site already has (or is waiting for) a repository.
    pub fn add_content_repository(
        &self,
        site: &str,
        repository: Arc<dyn ContentRepository>,
    ) -> Result<(), SiteError> {
        let mut registry = self.registry.lock();
        match self.site(site) {
            Some(registered) => registered.set_content_repository(repository),
            None if registry.pending.contains_key(site) => {
                Err(SiteError::RepositoryAlreadySet(site.to_string()))
            }
            None => {
                debug!("site"; "repository for {} waits for its site", site);
                registry.pending.insert(site.to_string(), repository);
                Ok(())
            }
        }
    }

    /// Detach a site's repository, disconnecting it if attached.
    pub fn remove_content_repository(
        &self,
        site: &str,
    ) -> Result<Option<Arc<dyn ContentRepository>>, SiteError> {
        let mut registry = self.registry.lock();
        if let Some(repository) = registry.pending.remove(site) {
            return Ok(Some(repository));
        }
        match self.site(site) {
            Some(registered) => registered.take_content_repository(),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for SiteManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.load();
        let mut sites: Vec<_> = snapshot.sites.keys().collect();
        sites.sort();
        f.debug_struct("SiteManager")
            .field("environment", &self.environment)
            .field("sites", &sites)
            .finish_non_exhaustive()
    }
}
