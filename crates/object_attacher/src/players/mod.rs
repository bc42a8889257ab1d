//! Players - ECS зеркало host player list
//!
//! Каждый frame `sync_players_from_host_main_thread` читает snapshot у
//! `NetworkApi` и приводит ECS entities к нему:
//! - новый игрок → spawn entity (+ `PlayerConnected`)
//! - известный игрок → обновить ped / position / synced object
//! - пропавший игрок → despawn (+ `PlayerDisconnected`)
//!
//! Reconciliation loop и event bridge работают только с ECS компонентами,
//! а не с host API напрямую.

pub mod components;
pub mod sync;

pub use components::*;
pub use sync::*;

use bevy::prelude::*;

/// Player connected (первый snapshot с этим id)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConnected {
    pub player: crate::host::PlayerId,
}

/// Player disconnected (id пропал из snapshot)
///
/// Consumer: `cleanup_disconnected_players_main_thread` (detach объекта)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDisconnected {
    pub player: crate::host::PlayerId,
}
