//! Attachment systems: disconnect cleanup + diagnostics

use super::{AttachError, AttachmentController, PlayerRef};
use crate::host::HostBridge;
use crate::logger;
use crate::players::PlayerDisconnected;
use bevy::prelude::*;

/// Диагностика ошибки attach/detach (единая точка для всех orchestration систем)
pub fn report_attach_error(context: &str, err: &AttachError) {
    match err {
        AttachError::NotRegistered(_) | AttachError::PedMissing(_) => {
            logger::log_warning(&format!("{}: {}", context, err));
        }
        AttachError::CreationFailed { .. } | AttachError::Host(_) => {
            logger::log_error(&format!("{}: {}", context, err));
        }
    }
}

/// System: удалить объект игрока, который отключился
///
/// Ped у отключившегося игрока уже нет → weapon visibility не трогаем.
///
/// NAMING: `_main_thread` суффикс = host API calls (NonSend resources)
pub fn cleanup_disconnected_players_main_thread(
    mut events: EventReader<PlayerDisconnected>,
    mut controller: ResMut<AttachmentController>,
    mut host: NonSendMut<HostBridge>,
) {
    for event in events.read() {
        if !controller.is_attached(event.player) {
            continue;
        }

        let player = PlayerRef {
            id: event.player,
            ped: None,
            position: Vec3::ZERO,
        };

        match controller.detach(host.engine.as_mut(), &player) {
            Ok(_) => logger::log(&format!(
                "cleanup: object of disconnected player {:?} removed",
                event.player
            )),
            Err(err) => {
                report_attach_error("cleanup", &err);
                // Entity недоступен - запись всё равно не должна пережить игрока
                controller.forget(event.player);
            }
        }
    }
}
