//! Multi-armed bandit engine (UCB1) for banner selection.
//!
//! All state for one slot lives in a single map entry, and every operation
//! takes exclusive access to that entry for its full duration. The
//! read-all-scores-then-increment step inside [`BanditEngine::select_banner`]
//! is therefore atomic with respect to any other operation on the same slot,
//! and counters stay exact under concurrent traffic.

use dashmap::DashMap;
use rotation_core::error::{RotationError, RotationResult};
use rotation_core::types::{BannerId, SlotId, UserGroupId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Per (slot, group, banner) counters. Both start at zero and never
/// decrease. Created lazily on first reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub views: u64,
    pub clicks: u64,
}

/// Snapshot of one banner's counters within a user group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerStats {
    pub banner_id: BannerId,
    pub views: u64,
    pub clicks: u64,
}

#[derive(Debug, Default)]
struct SlotState {
    /// Banners currently competing in this slot. Ordered, so that score
    /// ties resolve to the lowest banner id.
    banners: BTreeSet<BannerId>,
    /// Per-group statistics for banners under this slot.
    groups: HashMap<UserGroupId, BTreeMap<BannerId, GroupStats>>,
}

/// In-memory decision engine. The authoritative, low-latency source of
/// truth for banner selection; durable counters and event publication are
/// asynchronous mirrors maintained by the caller.
#[derive(Default)]
pub struct BanditEngine {
    slots: DashMap<SlotId, SlotState>,
}

impl BanditEngine {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Add a banner to a slot's active set, creating the slot if absent.
    /// Re-registering an active banner is a no-op; any statistics the
    /// banner accumulated earlier are left untouched.
    pub fn register_banner(&self, slot_id: SlotId, banner_id: BannerId) {
        self.slots
            .entry(slot_id)
            .or_default()
            .banners
            .insert(banner_id);
    }

    /// Remove a banner from a slot's active set and purge its statistics
    /// from every user group under that slot. Retiring a banner that is
    /// not active is not an error and leaves no residue.
    pub fn retire_banner(&self, slot_id: SlotId, banner_id: BannerId) -> RotationResult<()> {
        let mut slot = self
            .slots
            .get_mut(&slot_id)
            .ok_or(RotationError::SlotNotFound(slot_id))?;

        slot.banners.remove(&banner_id);
        for group_stats in slot.groups.values_mut() {
            group_stats.remove(&banner_id);
        }

        Ok(())
    }

    /// Increment the click counter for the (slot, group, banner) triple.
    /// The per-group entry is created on first reference. The banner is
    /// not required to be in the slot's active set: clicks on historical
    /// or just-retired banners are accepted.
    pub fn record_click(
        &self,
        slot_id: SlotId,
        banner_id: BannerId,
        group_id: UserGroupId,
    ) -> RotationResult<()> {
        let mut slot = self
            .slots
            .get_mut(&slot_id)
            .ok_or(RotationError::SlotNotFound(slot_id))?;

        slot.groups
            .entry(group_id)
            .or_default()
            .entry(banner_id)
            .or_default()
            .clicks += 1;

        Ok(())
    }

    /// Choose a banner from the slot's active set for the given group
    /// using UCB1 and record a view for the winner.
    ///
    /// Returns `None` (never an error) when the slot does not exist or
    /// has no active banners. A banner the group has never seen scores
    /// effectively infinite, so every active banner is shown at least
    /// once before any exploitation occurs. Score ties resolve to the
    /// lowest banner id.
    pub fn select_banner(&self, slot_id: SlotId, group_id: UserGroupId) -> Option<BannerId> {
        let mut slot = match self.slots.get_mut(&slot_id) {
            Some(slot) => slot,
            None => {
                debug!(slot_id = %slot_id, "select_banner: slot does not exist");
                return None;
            }
        };
        let slot = &mut *slot;

        if slot.banners.is_empty() {
            return None;
        }

        let group_stats = slot.groups.entry(group_id).or_default();

        let total_views: u64 = slot
            .banners
            .iter()
            .map(|b| group_stats.get(b).map_or(0, |s| s.views))
            .sum();

        let mut selected: Option<BannerId> = None;
        let mut best_score = f64::NEG_INFINITY;

        for &banner_id in &slot.banners {
            let stats = group_stats.get(&banner_id).copied().unwrap_or_default();
            let score = ucb1_score(stats.clicks, stats.views, total_views);
            if score > best_score {
                best_score = score;
                selected = Some(banner_id);
            }
        }

        // The active set is non-empty, so a winner always exists.
        let winner = selected?;
        group_stats.entry(winner).or_default().views += 1;

        Some(winner)
    }

    /// Snapshot of the recorded statistics for a (slot, group) pair,
    /// ordered by banner id. Empty when the slot or group is unknown.
    pub fn group_stats(&self, slot_id: SlotId, group_id: UserGroupId) -> Vec<BannerStats> {
        let slot = match self.slots.get(&slot_id) {
            Some(slot) => slot,
            None => return Vec::new(),
        };

        slot.groups
            .get(&group_id)
            .map(|stats| {
                stats
                    .iter()
                    .map(|(&banner_id, s)| BannerStats {
                        banner_id,
                        views: s.views,
                        clicks: s.clicks,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// UCB1 score for one banner: mean click-through rate plus an exploration
/// bonus that shrinks as the banner accumulates views. An unseen banner
/// scores infinite so it is always explored first.
fn ucb1_score(clicks: u64, views: u64, total_views: u64) -> f64 {
    if views == 0 {
        return f64::INFINITY;
    }
    let views = views as f64;
    clicks as f64 / views + 2.0 * ((total_views as f64).ln() / views).sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_register_creates_slot() {
        let engine = BanditEngine::new();
        engine.register_banner(SlotId::new(1), BannerId::new(1));

        let slot = engine.slots.get(&SlotId::new(1)).unwrap();
        assert!(slot.banners.contains(&BannerId::new(1)));
    }

    #[test]
    fn test_register_is_idempotent() {
        let engine = BanditEngine::new();
        engine.register_banner(SlotId::new(1), BannerId::new(1));
        engine.register_banner(SlotId::new(1), BannerId::new(1));

        let slot = engine.slots.get(&SlotId::new(1)).unwrap();
        assert_eq!(slot.banners.len(), 1);
    }

    #[test]
    fn test_retire_banner() {
        let engine = BanditEngine::new();
        engine.register_banner(SlotId::new(1), BannerId::new(1));

        engine.retire_banner(SlotId::new(1), BannerId::new(1)).unwrap();

        let slot = engine.slots.get(&SlotId::new(1)).unwrap();
        assert!(slot.banners.is_empty());
    }

    #[test]
    fn test_retire_from_missing_slot_fails() {
        let engine = BanditEngine::new();
        let err = engine
            .retire_banner(SlotId::new(2), BannerId::new(3))
            .unwrap_err();
        assert!(matches!(err, RotationError::SlotNotFound(s) if s == SlotId::new(2)));
    }

    #[test]
    fn test_retire_inactive_banner_is_not_an_error() {
        let engine = BanditEngine::new();
        engine.register_banner(SlotId::new(1), BannerId::new(1));
        engine.retire_banner(SlotId::new(1), BannerId::new(99)).unwrap();
    }

    #[test]
    fn test_retire_purges_group_statistics() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(1);
        let banner = BannerId::new(1);
        let group = UserGroupId::new(1);

        engine.register_banner(slot, banner);
        engine.record_click(slot, banner, group).unwrap();
        assert_eq!(engine.group_stats(slot, group).len(), 1);

        engine.retire_banner(slot, banner).unwrap();
        assert!(engine.group_stats(slot, group).is_empty());

        // Re-registering starts from fresh zero counters.
        engine.register_banner(slot, banner);
        engine.select_banner(slot, group).unwrap();
        let stats = engine.group_stats(slot, group);
        assert_eq!(stats, vec![BannerStats { banner_id: banner, views: 1, clicks: 0 }]);
    }

    #[test]
    fn test_record_click() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(1);
        let banner = BannerId::new(1);
        let group = UserGroupId::new(1);

        engine.register_banner(slot, banner);
        engine.record_click(slot, banner, group).unwrap();

        let stats = engine.group_stats(slot, group);
        assert_eq!(stats[0].clicks, 1);
        assert_eq!(stats[0].views, 0);
    }

    #[test]
    fn test_record_click_missing_slot_fails() {
        let engine = BanditEngine::new();
        let err = engine
            .record_click(SlotId::new(3), BannerId::new(4), UserGroupId::new(2))
            .unwrap_err();
        assert!(matches!(err, RotationError::SlotNotFound(_)));
    }

    #[test]
    fn test_record_click_on_unregistered_banner_is_permitted() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(1);
        engine.register_banner(slot, BannerId::new(1));

        // Banner 7 was never registered in this slot.
        engine
            .record_click(slot, BannerId::new(7), UserGroupId::new(1))
            .unwrap();
        let stats = engine.group_stats(slot, UserGroupId::new(1));
        assert_eq!(stats, vec![BannerStats { banner_id: BannerId::new(7), views: 0, clicks: 1 }]);
    }

    #[test]
    fn test_select_returns_registered_banner() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(1);
        let group = UserGroupId::new(1);
        engine.register_banner(slot, BannerId::new(1));
        engine.register_banner(slot, BannerId::new(2));

        let selected = engine.select_banner(slot, group).unwrap();
        assert!(selected == BannerId::new(1) || selected == BannerId::new(2));
    }

    #[test]
    fn test_select_on_missing_slot_returns_none() {
        let engine = BanditEngine::new();
        assert_eq!(engine.select_banner(SlotId::new(1), UserGroupId::new(1)), None);
    }

    #[test]
    fn test_select_on_empty_slot_returns_none() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(4);
        engine.register_banner(slot, BannerId::new(1));
        engine.retire_banner(slot, BannerId::new(1)).unwrap();

        assert_eq!(engine.select_banner(slot, UserGroupId::new(3)), None);
    }

    #[test]
    fn test_every_banner_explored_before_exploitation() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(1);
        let group = UserGroupId::new(1);
        engine.register_banner(slot, BannerId::new(1));
        engine.register_banner(slot, BannerId::new(2));

        let first = engine.select_banner(slot, group).unwrap();
        let second = engine.select_banner(slot, group).unwrap();

        let mut shown = vec![first, second];
        shown.sort();
        assert_eq!(shown, vec![BannerId::new(1), BannerId::new(2)]);
    }

    #[test]
    fn test_ucb_scores_with_mixed_stats() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(6);
        let group = UserGroupId::new(1);
        let b1 = BannerId::new(1);
        let b2 = BannerId::new(2);

        engine.register_banner(slot, b1);
        engine.register_banner(slot, b2);

        for _ in 0..10 {
            engine.record_click(slot, b1, group).unwrap();
        }
        {
            let mut slot_state = engine.slots.get_mut(&slot).unwrap();
            let group_stats = slot_state.groups.get_mut(&group).unwrap();
            group_stats.get_mut(&b1).unwrap().views = 10;
            group_stats.insert(b2, GroupStats { views: 20, clicks: 0 });
        }

        // T > 0, no division by zero; the clicked banner wins.
        let selected = engine.select_banner(slot, group).unwrap();
        assert_eq!(selected, b1);
    }

    #[test]
    fn test_tie_break_is_lowest_banner_id() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(1);
        let group = UserGroupId::new(1);
        engine.register_banner(slot, BannerId::new(9));
        engine.register_banner(slot, BannerId::new(3));

        // Both unseen, both score infinite: the lowest id is shown first.
        assert_eq!(engine.select_banner(slot, group), Some(BannerId::new(3)));
    }

    #[test]
    fn test_ucb1_score_function() {
        assert_eq!(ucb1_score(0, 0, 0), f64::INFINITY);
        assert_eq!(ucb1_score(5, 0, 100), f64::INFINITY);
        // ln(1) == 0: score collapses to the click-through rate.
        assert!((ucb1_score(1, 1, 1) - 1.0).abs() < f64::EPSILON);
        let score = ucb1_score(10, 10, 30);
        assert!(score > 1.0 && score.is_finite());
    }

    #[test]
    fn test_concurrent_register() {
        let engine = Arc::new(BanditEngine::new());
        let slot = SlotId::new(1);

        let handles: Vec<_> = (1..=100)
            .map(|i| {
                let engine = engine.clone();
                thread::spawn(move || engine.register_banner(slot, BannerId::new(i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.slots.get(&slot).unwrap().banners.len(), 100);
    }

    #[test]
    fn test_concurrent_clicks_are_exact() {
        let engine = Arc::new(BanditEngine::new());
        let slot = SlotId::new(1);
        let banner = BannerId::new(1);
        let group = UserGroupId::new(1);
        engine.register_banner(slot, banner);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        engine.record_click(slot, banner, group).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = engine.group_stats(slot, group);
        assert_eq!(stats[0].clicks, 1000);
    }

    #[test]
    fn test_concurrent_selections_are_exact() {
        let engine = Arc::new(BanditEngine::new());
        let slot = SlotId::new(1);
        let group = UserGroupId::new(1);
        engine.register_banner(slot, BannerId::new(1));
        engine.register_banner(slot, BannerId::new(2));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        engine.select_banner(slot, group).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total_views: u64 = engine.group_stats(slot, group).iter().map(|s| s.views).sum();
        assert_eq!(total_views, 1000);
    }

    #[test]
    fn test_exhaustive_selection() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(7);
        let group = UserGroupId::new(1);

        for i in 1..=10 {
            engine.register_banner(slot, BannerId::new(i));
        }
        for _ in 0..10_000 {
            engine.select_banner(slot, group).unwrap();
        }

        // Only shown banners have a statistics entry, so all ten must.
        let stats = engine.group_stats(slot, group);
        assert_eq!(stats.len(), 10);
        for entry in stats {
            assert!(entry.views > 0, "banner {} was never shown", entry.banner_id);
        }
    }

    #[test]
    fn test_popular_banner_dominates() {
        let engine = BanditEngine::new();
        let slot = SlotId::new(8);
        let group = UserGroupId::new(1);
        let popular = BannerId::new(1);

        engine.register_banner(slot, popular);
        engine.register_banner(slot, BannerId::new(2));
        engine.register_banner(slot, BannerId::new(3));

        for _ in 0..10_000 {
            let selected = engine.select_banner(slot, group).unwrap();
            if selected == popular {
                engine.record_click(slot, popular, group).unwrap();
            }
        }

        let stats = engine.group_stats(slot, group);
        let views_popular = stats.iter().find(|s| s.banner_id == popular).unwrap().views;
        for other in stats.iter().filter(|s| s.banner_id != popular) {
            assert!(
                views_popular as f64 >= 1.5 * other.views as f64,
                "banner {} got {} views vs {} for the always-clicked banner",
                other.banner_id,
                other.views,
                views_popular
            );
        }
    }
}
