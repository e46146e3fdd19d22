//! # Allocation — Daily Task Selection
//!
//! Picks which catalog tasks a user works on for a given day. Selection is a
//! pure function over a catalog snapshot so it can be tested without a
//! database; persistence and locking live in [`crate::db`].
//!
//! ## Passes
//!
//! 1. **Category-first**: categories in random order; for each category the
//!    user has nothing from yet today, one random task whose kind is unused.
//! 2. **Kind-fill**: kinds in random order; one random task per unused kind.
//! 3. **Relaxation**: every remaining unassigned task in random order,
//!    duplicate kinds allowed.
//!
//! One task per kind per day is a preference, not a guarantee: when the
//! catalog has fewer distinct kinds than the daily limit, pass 3 accepts
//! duplicate kinds. A task id is never picked twice for the same day, so a
//! catalog smaller than the limit yields a short day rather than a loop.
//!
//! Kinds and categories are discovered from the catalog at call time through
//! [`TaskCatalog`]; adding a new task kind needs no code change.

use crate::error::TaskResult;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;

/// The slice of a catalog row the selector needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CatalogEntry {
    pub id: i64,
    pub kind: String,
    pub category: String,
}

/// Source of active catalog entries.
#[async_trait::async_trait]
pub trait TaskCatalog: Send + Sync {
    /// All currently active tasks.
    async fn active_entries(&self) -> TaskResult<Vec<CatalogEntry>>;
}

#[async_trait::async_trait]
impl TaskCatalog for Vec<CatalogEntry> {
    async fn active_entries(&self) -> TaskResult<Vec<CatalogEntry>> {
        Ok(self.clone())
    }
}

/// Tracks what the user already holds today so the passes can avoid repeats.
struct DayState<'a> {
    taken_ids: HashSet<i64>,
    used_kinds: HashSet<&'a str>,
    used_categories: HashSet<&'a str>,
    picks: Vec<i64>,
    need: usize,
}

impl<'a> DayState<'a> {
    fn new(existing: &'a [CatalogEntry], need: usize) -> Self {
        DayState {
            taken_ids: existing.iter().map(|e| e.id).collect(),
            used_kinds: existing.iter().map(|e| e.kind.as_str()).collect(),
            used_categories: existing.iter().map(|e| e.category.as_str()).collect(),
            picks: Vec::with_capacity(need),
            need,
        }
    }

    fn satisfied(&self) -> bool {
        self.picks.len() >= self.need
    }

    fn take(&mut self, entry: &'a CatalogEntry) {
        self.taken_ids.insert(entry.id);
        self.used_kinds.insert(entry.kind.as_str());
        self.used_categories.insert(entry.category.as_str());
        self.picks.push(entry.id);
    }

    fn is_fresh(&self, entry: &CatalogEntry) -> bool {
        !self.taken_ids.contains(&entry.id) && !self.used_kinds.contains(entry.kind.as_str())
    }
}

fn distinct_categories(catalog: &[CatalogEntry]) -> Vec<&str> {
    let mut seen = HashSet::new();
    catalog
        .iter()
        .map(|e| e.category.as_str())
        .filter(|c| seen.insert(*c))
        .collect()
}

fn distinct_kinds(catalog: &[CatalogEntry]) -> Vec<&str> {
    let mut seen = HashSet::new();
    catalog
        .iter()
        .map(|e| e.kind.as_str())
        .filter(|k| seen.insert(*k))
        .collect()
}

/// Select up to `need` task ids from `catalog` for a user who already holds
/// `existing` today. Returned ids are distinct and exclude existing ones.
pub fn select_tasks<'a, R: Rng + ?Sized>(
    catalog: &'a [CatalogEntry],
    existing: &'a [CatalogEntry],
    need: usize,
    rng: &mut R,
) -> Vec<i64> {
    let mut state = DayState::new(existing, need);
    if need == 0 || catalog.is_empty() {
        return state.picks;
    }

    // Pass 1: one task per unrepresented category
    let mut categories: Vec<&str> = distinct_categories(catalog);
    categories.shuffle(rng);
    for category in categories {
        if state.satisfied() {
            break;
        }
        if state.used_categories.contains(category) {
            continue;
        }
        let candidates: Vec<&CatalogEntry> = catalog
            .iter()
            .filter(|e| e.category == category && state.is_fresh(e))
            .collect();
        if let Some(entry) = candidates.choose(rng) {
            state.take(*entry);
        }
    }

    // Pass 2: one task per unused kind
    let mut kinds: Vec<&str> = distinct_kinds(catalog);
    kinds.shuffle(rng);
    for kind in kinds {
        if state.satisfied() {
            break;
        }
        if state.used_kinds.contains(kind) {
            continue;
        }
        let candidates: Vec<&CatalogEntry> = catalog
            .iter()
            .filter(|e| e.kind == kind && !state.taken_ids.contains(&e.id))
            .collect();
        if let Some(entry) = candidates.choose(rng) {
            state.take(*entry);
        }
    }

    // Pass 3: relax the one-per-kind preference
    if !state.satisfied() {
        let mut remaining: Vec<&CatalogEntry> = catalog
            .iter()
            .filter(|e| !state.taken_ids.contains(&e.id))
            .collect();
        remaining.shuffle(rng);
        for entry in remaining {
            if state.satisfied() {
                break;
            }
            state.take(entry);
        }
    }

    state.picks
}
