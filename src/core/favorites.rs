//! Capacity-bounded, ordered favorites with the replacement workflow.
//!
//! A favorite is added by toggling a coin that is not yet pinned. Once the set
//! holds [`MAX_FAVORITES`] coins, toggling another one does not touch the set:
//! the candidate is parked and the caller has to either [`replace`] one of the
//! current favorites with it or [`cancel_replacement`]. Every change to the set
//! is published on a watch channel so the summary view can be recomputed.
//!
//! [`replace`]: FavoritesSet::replace
//! [`cancel_replacement`]: FavoritesSet::cancel_replacement

use crate::core::catalog::Catalog;
use crate::core::error::TrackerError;
use tokio::sync::watch;
use tracing::{debug, info};

pub const MAX_FAVORITES: usize = 5;

/// Where a toggle was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOrigin {
    /// The main coin list (or search results).
    PrimaryList,
    /// The picker shown while a replacement is pending.
    ReplacementPicker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// The set is full. `current` lists the favorites the user may evict for
    /// `candidate`.
    ReplacementRequired {
        candidate: String,
        current: Vec<String>,
    },
}

pub struct FavoritesSet {
    ids: Vec<String>,
    pending: Option<String>,
    tx: watch::Sender<Vec<String>>,
}

impl FavoritesSet {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            ids: Vec::new(),
            pending: None,
            tx,
        }
    }

    /// Receives the full favorites list after every successful change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.tx.subscribe()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|fav| fav == id)
    }

    pub fn pending_candidate(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn toggle(
        &mut self,
        catalog: &Catalog,
        id: &str,
        origin: ToggleOrigin,
    ) -> Result<ToggleOutcome, TrackerError> {
        if let Some(candidate) = &self.pending {
            return Err(TrackerError::ReplacementInProgress(candidate.clone()));
        }
        if origin == ToggleOrigin::ReplacementPicker {
            return Err(TrackerError::InvalidToggle {
                id: id.to_string(),
                reason: "the replacement picker only evicts through replace".to_string(),
            });
        }

        if let Some(pos) = self.position(id) {
            self.ids.remove(pos);
            info!("Removed favorite {}", id);
            self.publish();
            return Ok(ToggleOutcome::Removed);
        }

        if !catalog.contains(id) {
            return Err(TrackerError::UnknownCoin(id.to_string()));
        }

        if self.ids.len() >= MAX_FAVORITES {
            debug!("Favorites full, holding {} for replacement", id);
            self.pending = Some(id.to_string());
            return Ok(ToggleOutcome::ReplacementRequired {
                candidate: id.to_string(),
                current: self.ids.clone(),
            });
        }

        self.ids.push(id.to_string());
        info!("Added favorite {}", id);
        self.publish();
        Ok(ToggleOutcome::Added)
    }

    /// Evicts `evict_id` and appends the pending `candidate_id` at the end.
    pub fn replace(
        &mut self,
        catalog: &Catalog,
        evict_id: &str,
        candidate_id: &str,
    ) -> Result<(), TrackerError> {
        if self.pending.as_deref() != Some(candidate_id) {
            return Err(TrackerError::NoPendingReplacement(candidate_id.to_string()));
        }
        let pos = self
            .position(evict_id)
            .ok_or_else(|| TrackerError::NotAFavorite(evict_id.to_string()))?;
        if !catalog.contains(candidate_id) {
            self.pending = None;
            return Err(TrackerError::UnknownCoin(candidate_id.to_string()));
        }

        self.ids.remove(pos);
        self.ids.push(candidate_id.to_string());
        self.pending = None;
        info!("Replaced favorite {} with {}", evict_id, candidate_id);
        self.publish();
        Ok(())
    }

    /// Drops the pending candidate. Returns it, if there was one.
    pub fn cancel_replacement(&mut self) -> Option<String> {
        let cancelled = self.pending.take();
        if let Some(candidate) = &cancelled {
            debug!("Cancelled replacement for {}", candidate);
        }
        cancelled
    }

    /// Drops favorites that no longer reference a coin in `catalog`.
    /// Returns the ids that were dropped.
    pub fn retain_known(&mut self, catalog: &Catalog) -> Vec<String> {
        let (kept, dropped): (Vec<String>, Vec<String>) = self
            .ids
            .drain(..)
            .partition(|id| catalog.contains(id));
        self.ids = kept;
        if self
            .pending
            .as_deref()
            .is_some_and(|candidate| !catalog.contains(candidate))
        {
            self.pending = None;
        }
        if !dropped.is_empty() {
            info!("Dropped favorites missing from catalog: {:?}", dropped);
            self.publish();
        }
        dropped
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|fav| fav == id)
    }

    fn publish(&self) {
        self.tx.send_replace(self.ids.clone());
    }
}

impl Default for FavoritesSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The one-line favorites summary shown above the coin list.
pub fn summary_line(catalog: &Catalog, favorites: &[String]) -> String {
    if favorites.is_empty() {
        return "Welcome to the Cryptocurrency tracker!".to_string();
    }
    let entries: Vec<String> = favorites
        .iter()
        .filter_map(|id| catalog.get(id))
        .map(|coin| match coin.current_price_usd {
            Some(price) => format!("{} ${price:.2}", coin.symbol),
            None => format!("{} N/A", coin.symbol),
        })
        .collect();
    format!("Favorites: {}", entries.join(", "))
}
