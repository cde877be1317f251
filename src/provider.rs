//! Provider cache
//!
//! Dictionary and coverage sources are loaded at most once per distinct
//! locator set. Concurrent requests for the same set wait on a single load
//! and share the resulting `Arc`. Failed loads are not cached, so a later
//! request retries.
//!
//! A [`BuildSession`] pins the snapshot handles used by one build.

use once_cell::sync::{Lazy, OnceCell};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::config::BuildConfig;
use crate::coverage::{load_coverage, CoverageProvider, InstanceCoverage};
use crate::dictionary::{load_snapshot, DictionaryModel, DictionarySnapshot};
use crate::error::Result;

/// Order-insensitive set of source locators
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LocatorSet(BTreeSet<String>);

impl LocatorSet {
    pub fn new<I, S>(locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(locators.into_iter().map(Into::into).collect())
    }

    pub fn from_paths(paths: &[PathBuf]) -> Self {
        Self::new(paths.iter().map(|p| p.display().to_string()))
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.0.iter().map(PathBuf::from).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Single-flight cache keyed by locator set
pub struct ProviderCache<T> {
    entries: Mutex<HashMap<LocatorSet, Arc<OnceCell<Arc<T>>>>>,
}

impl<T> Default for ProviderCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> ProviderCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, running `load` if none exists yet
    pub fn get_or_load<F>(&self, key: &LocatorSet, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(&LocatorSet) -> Result<T>,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.entry(key.clone()).or_default().clone()
        };
        cell.get_or_try_init(|| {
            debug!(locators = ?key, "Loading provider");
            load(key).map(Arc::new)
        })
        .cloned()
    }

    /// Number of locator sets holding a loaded value
    pub fn loaded(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|c| c.get().is_some()).count()
    }

    /// Drop every cached value
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

/// Dictionary and coverage caches
#[derive(Default)]
pub struct Providers {
    dictionaries: ProviderCache<DictionarySnapshot>,
    coverage: ProviderCache<InstanceCoverage>,
}

static GLOBAL_PROVIDERS: Lazy<Providers> = Lazy::new(Providers::new);

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance
    pub fn global() -> &'static Providers {
        &GLOBAL_PROVIDERS
    }

    pub fn dictionary(&self, locators: &LocatorSet) -> Result<Arc<DictionarySnapshot>> {
        self.dictionaries
            .get_or_load(locators, |key| load_snapshot(&key.paths()))
    }

    pub fn coverage(&self, locators: &LocatorSet) -> Result<Arc<InstanceCoverage>> {
        self.coverage
            .get_or_load(locators, |key| load_coverage(&key.paths()))
    }

    /// Open a session over the sources named by the configuration
    ///
    /// Either provider failing aborts the session.
    pub fn session(&self, config: &BuildConfig) -> Result<BuildSession> {
        let dictionary = self.dictionary(&LocatorSet::from_paths(&config.dictionary_paths()))?;
        let coverage = self.coverage(&LocatorSet::from_paths(&config.coverage_paths()))?;
        Ok(BuildSession::new(dictionary, coverage))
    }
}

/// Snapshot handles for one build
#[derive(Clone)]
pub struct BuildSession {
    dictionary: Arc<dyn DictionaryModel>,
    coverage: Arc<dyn CoverageProvider>,
}

impl BuildSession {
    pub fn new(dictionary: Arc<dyn DictionaryModel>, coverage: Arc<dyn CoverageProvider>) -> Self {
        Self {
            dictionary,
            coverage,
        }
    }

    pub fn dictionary(&self) -> &dyn DictionaryModel {
        self.dictionary.as_ref()
    }

    pub fn coverage(&self) -> &dyn CoverageProvider {
        self.coverage.as_ref()
    }
}
