//! Custom schedules и tick counter
//!
//! Tick-based scheduling для periodic задач.
//!
//! # Архитектура
//!
//! **FixedUpdate (60 Hz)** → increment_tick_counter
//!   ├─ tick % reconcile == 0 → ReconcileUpdate (default 1000ms = 60 ticks)
//!   ├─ tick % load_poll == 0 → LoadPollUpdate (default 100ms = 6 ticks)
//!   └─ tick % idle_cam  == 0 → IdleCamUpdate (default 2000ms = 120 ticks)
//!
//! Интервалы в ms приходят из `AttacherConfig` и переводятся в ticks один
//! раз при старте (`IntervalTicks`).

use crate::config::AttacherConfig;
use bevy::ecs::schedule::ScheduleLabel;
use bevy::prelude::Resource;

pub mod timer_systems;

/// Частота FixedUpdate (ticks per second)
pub const FIXED_HZ: f64 = 60.0;

/// Глобальный tick counter (wraparound safe)
///
/// u64::MAX / 60 / 60 / 60 / 24 / 365 ≈ 9.7 миллиардов лет.
#[derive(Resource, Default)]
pub struct FixedTickCounter {
    pub tick: u64,
}

/// Периоды custom schedules в ticks
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTicks {
    pub reconcile: u64,
    pub load_poll: u64,
    pub idle_cam: u64,
}

impl IntervalTicks {
    pub fn from_config(config: &AttacherConfig) -> Self {
        Self {
            reconcile: ticks_for_interval(config.check_interval_ms, FIXED_HZ),
            load_poll: ticks_for_interval(config.load_poll_interval_ms, FIXED_HZ),
            idle_cam: ticks_for_interval(config.idle_cam_interval_ms, FIXED_HZ),
        }
    }
}

/// ms → ticks (округление, минимум 1 tick)
pub fn ticks_for_interval(interval_ms: u64, hz: f64) -> u64 {
    let ticks = (interval_ms as f64 * hz / 1000.0).round() as u64;
    ticks.max(1)
}

/// Custom schedule: ReconcileUpdate (reconciliation loop)
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileUpdate;

/// Custom schedule: LoadPollUpdate (poll моделей / animation dictionaries)
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadPollUpdate;

/// Custom schedule: IdleCamUpdate (idle-camera prevention в debug режиме)
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdleCamUpdate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals_in_ticks() {
        let ticks = IntervalTicks::from_config(&AttacherConfig::default());
        assert_eq!(ticks.reconcile, 60);
        assert_eq!(ticks.load_poll, 6);
        assert_eq!(ticks.idle_cam, 120);
    }

    #[test]
    fn test_short_interval_rounds_up_to_one_tick() {
        assert_eq!(ticks_for_interval(1, FIXED_HZ), 1);
        assert_eq!(ticks_for_interval(25, FIXED_HZ), 2); // 1.5 → 2
    }
}
