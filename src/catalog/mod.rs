//! Title catalog: identifier slots ↔ console titles, backed by a cache.
//!
//! Slots are assigned in cache order starting after the reserved system
//! slots, and are rebuilt from scratch on every load or refresh. They are only
//! stable for as long as the underlying list keeps its size and order.

pub mod input_source;
pub mod store;
pub mod title;

pub use input_source::{
    DEFAULT_IDENTIFIER, FIRST_TITLE_SLOT, InputSource, InputSourceType, RESERVED_SLOTS,
    SYSTEM_SOURCES, SystemSource,
};
pub use store::{FileTitleStore, MemoryTitleStore, TitleStore};
pub use title::{Title, TitleList};

use crate::error::BridgeError;
use async_trait::async_trait;
use log::{error, info, warn};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

/// Where the authoritative title list comes from (the console, in production).
#[async_trait]
pub trait TitleSource: Send + Sync {
    async fn fetch_titles(&self) -> Result<TitleList, BridgeError>;
}

/// Outcome of [`TitleCatalog::refresh_from_device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { titles: usize },
    Failed,
    /// Another refresh was already running.
    Skipped,
}

#[derive(Debug, Default)]
struct CatalogState {
    titles: TitleList,
    by_slot: BTreeMap<u32, Title>,
    by_title: HashMap<String, u32>,
}

impl CatalogState {
    fn build(titles: TitleList) -> Self {
        let mut by_slot = BTreeMap::new();
        let mut by_title = HashMap::new();
        for (slot, title) in (FIRST_TITLE_SLOT..).zip(titles.iter()) {
            by_title.insert(title.id.clone(), slot);
            by_slot.insert(slot, title);
        }
        Self {
            titles,
            by_slot,
            by_title,
        }
    }
}

pub struct TitleCatalog {
    store: Box<dyn TitleStore>,
    state: RwLock<CatalogState>,
    refreshing: AtomicBool,
}

impl TitleCatalog {
    /// An empty catalog; call [`load`](Self::load) before resolving anything.
    pub fn new(store: Box<dyn TitleStore>) -> Self {
        Self {
            store,
            state: RwLock::new(CatalogState::default()),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Populate from the cache.
    ///
    /// A missing cache is initialised to `{}`. Unreadable or corrupt caches are
    /// logged and leave the current in-memory state (and the file) untouched.
    pub fn load(&self) {
        let bytes = match self.store.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                info!(
                    "[Catalog] No title cache at {} (first run)",
                    self.store.describe()
                );
                if let Err(e) = self.store.write(b"{}") {
                    error!("[Catalog] Failed to create title cache: {}", e);
                }
                *self.state.write() = CatalogState::default();
                return;
            }
            Err(e) => {
                error!(
                    "[Catalog] Failed to read title cache {}: {}",
                    self.store.describe(),
                    e
                );
                return;
            }
        };

        match serde_json::from_slice::<TitleList>(&bytes) {
            Ok(titles) => {
                info!(
                    "[Catalog] Loaded {} titles from {}",
                    titles.len(),
                    self.store.describe()
                );
                *self.state.write() = CatalogState::build(titles);
            }
            Err(e) => warn!(
                "[Catalog] Ignoring corrupt title cache {}: {}",
                self.store.describe(),
                e
            ),
        }
    }

    /// Replace the catalog with the device's title list.
    ///
    /// On failure the cache and the in-memory mapping stay exactly as they were.
    pub async fn refresh_from_device(&self, source: &dyn TitleSource) -> RefreshOutcome {
        if self.refreshing.swap(true, Ordering::SeqCst) {
            info!("[Catalog] Refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }
        let outcome = self.refresh_inner(source).await;
        self.refreshing.store(false, Ordering::SeqCst);
        outcome
    }

    async fn refresh_inner(&self, source: &dyn TitleSource) -> RefreshOutcome {
        let titles = match source.fetch_titles().await {
            Ok(titles) => titles,
            Err(e) => {
                warn!("[Catalog] Title refresh failed, keeping cached titles: {}", e);
                return RefreshOutcome::Failed;
            }
        };

        match serde_json::to_vec_pretty(&titles) {
            Ok(bytes) => {
                if let Err(e) = self.store.write(&bytes) {
                    error!(
                        "[Catalog] Failed to write title cache {}: {}",
                        self.store.describe(),
                        e
                    );
                }
            }
            Err(e) => error!("[Catalog] Failed to encode title cache: {}", e),
        }

        let count = titles.iter().count();
        *self.state.write() = CatalogState::build(titles);
        info!("[Catalog] Refreshed {} titles from device", count);
        RefreshOutcome::Updated { titles: count }
    }

    /// Title at `slot`; reserved and unknown slots resolve to `None`.
    pub fn resolve_slot_to_title(&self, slot: u32) -> Option<Title> {
        self.state.read().by_slot.get(&slot).cloned()
    }

    /// Slot currently assigned to `title_id`.
    pub fn resolve_title_to_slot(&self, title_id: &str) -> Option<u32> {
        self.state.read().by_title.get(title_id).copied()
    }

    /// Input source for any slot, fixed or dynamic.
    pub fn input_source(&self, slot: u32) -> Option<InputSource> {
        match input_source::system_source(slot) {
            Some(source) => Some(InputSource::Fixed(source)),
            None => self.resolve_slot_to_title(slot).map(InputSource::Dynamic),
        }
    }

    /// Every input source by slot: system screens first, then titles.
    pub fn input_sources(&self) -> Vec<(u32, InputSource)> {
        let state = self.state.read();
        SYSTEM_SOURCES
            .iter()
            .map(|source| (source.slot, InputSource::Fixed(source)))
            .chain(
                state
                    .by_slot
                    .iter()
                    .map(|(slot, title)| (*slot, InputSource::Dynamic(title.clone()))),
            )
            .collect()
    }

    /// Number of dynamic (title) slots.
    pub fn len(&self) -> usize {
        self.state.read().by_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cached title list.
    pub fn titles(&self) -> TitleList {
        self.state.read().titles.clone()
    }
}
