//! Timer systems для tick-based schedules
//!
//! Запускаются в FixedUpdate (60 Hz) и управляют запуском custom schedules
//! через tick counter.

use super::{FixedTickCounter, IdleCamUpdate, IntervalTicks, LoadPollUpdate, ReconcileUpdate};
use bevy::prelude::{ResMut, World};

/// System: Increment tick counter (FixedUpdate, запускается ПЕРВЫМ)
pub fn increment_tick_counter(mut counter: ResMut<FixedTickCounter>) {
    counter.tick = counter.tick.wrapping_add(1);
}

/// System: ReconcileUpdate каждые `IntervalTicks::reconcile` ticks
///
/// Exclusive system (требует &mut World для run_schedule).
pub fn run_reconcile_timer(world: &mut World) {
    if is_due(world, |ticks| ticks.reconcile) {
        world.run_schedule(ReconcileUpdate);
    }
}

/// System: LoadPollUpdate каждые `IntervalTicks::load_poll` ticks
pub fn run_load_poll_timer(world: &mut World) {
    if is_due(world, |ticks| ticks.load_poll) {
        world.run_schedule(LoadPollUpdate);
    }
}

/// System: IdleCamUpdate каждые `IntervalTicks::idle_cam` ticks
pub fn run_idle_cam_timer(world: &mut World) {
    if is_due(world, |ticks| ticks.idle_cam) {
        world.run_schedule(IdleCamUpdate);
    }
}

fn is_due(world: &World, period: impl Fn(&IntervalTicks) -> u64) -> bool {
    let (Some(counter), Some(ticks)) = (
        world.get_resource::<FixedTickCounter>(),
        world.get_resource::<IntervalTicks>(),
    ) else {
        return false;
    };

    counter.tick % period(ticks).max(1) == 0
}
