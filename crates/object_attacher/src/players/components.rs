//! Player компоненты: Player, LocalPlayer, PlayerPed, PlayerPosition, SyncedObject

use crate::attachment::PlayerRef;
use crate::host::{PedHandle, PlayerId};
use bevy::prelude::*;

/// Игрок (local или remote), зеркало host player
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
}

/// Marker: local player (этот клиент)
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LocalPlayer;

/// Engine handle персонажа. None - игрок не streamed in.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerPed(pub Option<PedHandle>);

/// World position игрока (обновляется каждый frame из snapshot)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerPosition(pub Vec3);

/// Synced meta "AttachedObject" - desired object name
///
/// None (или пустая строка у хоста) = "нет объекта".
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncedObject(pub Option<String>);

impl SyncedObject {
    /// Пустая строка нормализуется в None
    pub fn from_meta(meta: Option<&str>) -> Self {
        Self(meta.filter(|name| !name.is_empty()).map(str::to_string))
    }

    pub fn desired(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Сборка PlayerRef для attachment controller из ECS компонентов
pub fn player_ref(player: &Player, ped: &PlayerPed, position: &PlayerPosition) -> PlayerRef {
    PlayerRef {
        id: player.id,
        ped: ped.0,
        position: position.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synced_object_empty_string_is_absent() {
        assert_eq!(SyncedObject::from_meta(Some("")).desired(), None);
        assert_eq!(SyncedObject::from_meta(None).desired(), None);
        assert_eq!(SyncedObject::from_meta(Some("hat")).desired(), Some("hat"));
    }
}
