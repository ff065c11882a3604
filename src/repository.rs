//! Storage collaborator for saved periods and the draft under edit.
//!
//! The engine never touches storage. The tracker is handed a [`LedgerStore`]
//! and goes through these traits only, so the backend (memory, JSON file,
//! SQLite) is picked by the caller.

use std::sync::{Arc, RwLock};

use crate::entities::{Period, PeriodDraft};
use crate::error::Result;

/// Ordered, append-only history of saved periods
pub trait PeriodRepository {
    /// All saved periods, oldest first
    fn load_all(&self) -> Result<Vec<Period>>;

    /// Replace the stored history with `periods`
    fn save_all(&self, periods: &[Period]) -> Result<()>;

    /// Remove every saved period
    fn clear(&self) -> Result<()>;

    /// Append one snapshot at the end of history
    fn append(&self, period: &Period) -> Result<()> {
        let mut periods = self.load_all()?;
        periods.push(period.clone());
        self.save_all(&periods)
    }

    fn latest(&self) -> Result<Option<Period>> {
        Ok(self.load_all()?.pop())
    }
}

/// Persistence for the single in-progress week
pub trait DraftStore {
    fn load_draft(&self) -> Result<Option<PeriodDraft>>;
    fn save_draft(&self, draft: &PeriodDraft) -> Result<()>;
    fn discard_draft(&self) -> Result<()>;
}

/// Everything the tracker needs from a backend
pub trait LedgerStore: PeriodRepository + DraftStore {}

impl<T: PeriodRepository + DraftStore> LedgerStore for T {}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

#[derive(Default)]
struct MemoryState {
    periods: Vec<Period>,
    draft: Option<PeriodDraft>,
}

/// Ephemeral store. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_periods(periods: Vec<Period>) -> Self {
        let repo = Self::new();
        repo.write().periods = periods;
        repo
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PeriodRepository for InMemoryRepository {
    fn load_all(&self) -> Result<Vec<Period>> {
        Ok(self.read().periods.clone())
    }

    fn save_all(&self, periods: &[Period]) -> Result<()> {
        self.write().periods = periods.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.write().periods.clear();
        Ok(())
    }

    fn append(&self, period: &Period) -> Result<()> {
        self.write().periods.push(period.clone());
        Ok(())
    }
}

impl DraftStore for InMemoryRepository {
    fn load_draft(&self) -> Result<Option<PeriodDraft>> {
        Ok(self.read().draft.clone())
    }

    fn save_draft(&self, draft: &PeriodDraft) -> Result<()> {
        self.write().draft = Some(draft.clone());
        Ok(())
    }

    fn discard_draft(&self) -> Result<()> {
        self.write().draft = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::ExchangeRateSet;
    use chrono::NaiveDate;

    fn period(day: u32) -> Period {
        PeriodDraft::new(
            NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            ExchangeRateSet::new(5.0, 5.5, 0.0),
        )
        .snapshot()
    }

    #[test]
    fn test_append_keeps_order() {
        let repo = InMemoryRepository::new();
        let first = period(1);
        let second = period(8);

        repo.append(&first).unwrap();
        repo.append(&second).unwrap();

        let loaded = repo.load_all().unwrap();
        assert_eq!(loaded, vec![first, second.clone()]);
        assert_eq!(repo.latest().unwrap(), Some(second));
    }

    #[test]
    fn test_clear() {
        let repo = InMemoryRepository::with_periods(vec![period(1), period(8)]);
        repo.clear().unwrap();
        assert!(repo.load_all().unwrap().is_empty());
        assert_eq!(repo.latest().unwrap(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let repo = InMemoryRepository::new();
        let handle = repo.clone();
        repo.append(&period(1)).unwrap();
        assert_eq!(handle.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_draft_round_trip() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_draft().unwrap().is_none());

        let mut draft = PeriodDraft::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), ExchangeRateSet::cleared());
        draft.add_account("Cash");
        repo.save_draft(&draft).unwrap();
        assert_eq!(repo.load_draft().unwrap(), Some(draft));

        repo.discard_draft().unwrap();
        assert!(repo.load_draft().unwrap().is_none());
    }
}
