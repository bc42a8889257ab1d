//! Host → ECS player sync

use super::{LocalPlayer, Player, PlayerConnected, PlayerDisconnected, PlayerPed, PlayerPosition, SyncedObject};
use crate::host::{HostBridge, PlayerId};
use crate::logger;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

/// Resource: PlayerId → ECS Entity
#[derive(Resource, Debug, Default)]
pub struct PlayerIndex {
    pub entities: HashMap<PlayerId, Entity>,
}

impl PlayerIndex {
    pub fn get(&self, id: PlayerId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }
}

/// System: привести ECS players к host snapshot (PreUpdate, ПЕРВАЯ система)
///
/// NAMING: `_main_thread` суффикс = host API calls (NonSend resources)
pub fn sync_players_from_host_main_thread(
    mut commands: Commands,
    host: NonSend<HostBridge>,
    mut index: ResMut<PlayerIndex>,
    mut players: Query<(
        &mut PlayerPed,
        &mut PlayerPosition,
        &mut SyncedObject,
        Has<LocalPlayer>,
    )>,
    mut connected: EventWriter<PlayerConnected>,
    mut disconnected: EventWriter<PlayerDisconnected>,
) {
    let local_id = host.network.local_player();
    let snapshot = host.network.players();
    let mut seen = HashSet::with_capacity(snapshot.len());

    for entry in snapshot {
        seen.insert(entry.id);
        let is_local = local_id == Some(entry.id);
        let synced = SyncedObject::from_meta(entry.synced_object.as_deref());

        let existing = index
            .get(entry.id)
            .and_then(|entity| players.get_mut(entity).ok().map(|components| (entity, components)));

        match existing {
            Some((entity, (mut ped, mut position, mut synced_object, was_local))) => {
                // set_if_neq: Changed<T> срабатывает только на реальные изменения
                ped.set_if_neq(PlayerPed(entry.ped));
                position.set_if_neq(PlayerPosition(entry.position));
                synced_object.set_if_neq(synced);

                if is_local && !was_local {
                    commands.entity(entity).insert(LocalPlayer);
                } else if !is_local && was_local {
                    commands.entity(entity).remove::<LocalPlayer>();
                }
            }
            None if index.get(entry.id).is_some() => {
                // Spawn ещё не применён (Commands) - обновим на следующем frame
            }
            None => {
                let mut entity_commands = commands.spawn((
                    Player { id: entry.id },
                    PlayerPed(entry.ped),
                    PlayerPosition(entry.position),
                    synced,
                ));
                if is_local {
                    entity_commands.insert(LocalPlayer);
                }

                index.entities.insert(entry.id, entity_commands.id());
                connected.write(PlayerConnected { player: entry.id });
                logger::log(&format!(
                    "player {:?} connected (local: {})",
                    entry.id, is_local
                ));
            }
        }
    }

    let gone: Vec<PlayerId> = index
        .entities
        .keys()
        .filter(|id| !seen.contains(id))
        .copied()
        .collect();

    for id in gone {
        if let Some(entity) = index.entities.remove(&id) {
            commands.entity(entity).despawn();
        }
        disconnected.write(PlayerDisconnected { player: id });
        logger::log(&format!("player {:?} disconnected", id));
    }
}
