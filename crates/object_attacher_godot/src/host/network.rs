//! GodotNetwork / GodotDebugView
//!
//! Сеть принадлежит игре (GDScript multiplayer): мы только читаем
//! зарегистрированных игроков и кладём server events в outbox.

use super::{Outbound, SharedWorld};
use godot::classes::Control;
use godot::prelude::*;
use object_attacher::{DebugViewApi, HostError, NetworkApi, PlayerId, PlayerSnapshot};

pub struct GodotNetwork {
    world: SharedWorld,
}

impl GodotNetwork {
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

impl NetworkApi for GodotNetwork {
    fn local_player(&self) -> Option<PlayerId> {
        self.world.borrow().local_player
    }

    fn players(&self) -> Vec<PlayerSnapshot> {
        let world = self.world.borrow();
        world
            .players
            .iter()
            .map(|(id, player)| PlayerSnapshot {
                id: *id,
                // Freed character node = streamed out
                ped: player.ped.filter(|ped| world.ped(*ped).is_some()),
                position: world.player_position(player),
                synced_object: player.synced_object.clone(),
            })
            .collect()
    }

    fn emit_server(&mut self, event: &str, args: &[serde_json::Value]) -> Result<(), HostError> {
        self.world.borrow_mut().outbox.push(Outbound::Server {
            event: event.to_string(),
            args: args.to_vec(),
        });
        Ok(())
    }
}

/// Debug view = DebugPanel (Control) + `debug_view_event` signal
pub struct GodotDebugView {
    world: SharedWorld,
    panel: Gd<Control>,
}

impl GodotDebugView {
    pub fn new(world: SharedWorld, panel: Gd<Control>) -> Self {
        Self { world, panel }
    }
}

impl DebugViewApi for GodotDebugView {
    fn emit(&mut self, event: &str, payload: serde_json::Value) -> Result<(), HostError> {
        self.world.borrow_mut().outbox.push(Outbound::View {
            event: event.to_string(),
            payload,
        });
        Ok(())
    }

    fn is_visible(&self) -> bool {
        self.panel.is_instance_valid() && self.panel.is_visible()
    }

    fn set_visible(&mut self, visible: bool) {
        if self.panel.is_instance_valid() {
            self.panel.set_visible(visible);
        }
    }
}
