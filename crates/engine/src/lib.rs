//! Banner selection engine: a UCB1 multi-armed bandit over per-slot,
//! per-user-group view/click statistics.

pub mod bandit;

pub use bandit::{BanditEngine, BannerStats, GroupStats};
