//! Reconciliation loop - periodic convergence remote players → attachment state
//!
//! Запускается в `ReconcileUpdate` schedule (каждые `check_interval_ms`).
//!
//! # State machine (per remote player)
//!
//! ```text
//! desired | attached | in_range | action
//! --------+----------+----------+-------------------------------
//! None    | None     |    *     | -
//! None    | Some     |    *     | Detach
//! Some(n) | None     |   true   | Attach(n)
//! Some(n) | None     |   false  | -
//! Some(n) | Some     |   false  | Detach
//! Some(n) | Some(n)  |   true   | -
//! Some(n) | Some(m)  |   true   | Attach(n)  (detach-then-attach)
//! ```
//!
//! `in_range` = ped существует && distance(remote, local) <= object_range.
//! `attached` = handle, entity которого ещё существует (мёртвый handle забывается).
//! Attach(n) с незарегистрированным n: старый объект снимается, attach падает
//! с `NotRegistered`.
//! Idempotent: при стабильных inputs первый tick сходится, дальше - ноль calls.

#[cfg(test)]
mod reconcile_tests;

use crate::attachment::{report_attach_error, AttachmentController};
use crate::config::AttacherConfig;
use crate::host::HostBridge;
use crate::loading::ResourceLoads;
use crate::logger;
use crate::players::{player_ref, LocalPlayer, Player, PlayerPed, PlayerPosition, SyncedObject};
use crate::registry::ObjectRegistry;
use bevy::prelude::*;

/// Решение reconciliation для одного игрока
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    None,
    Attach,
    Detach,
}

/// Чистая функция перехода (см. таблицу в module docs)
pub fn decide(desired: Option<&str>, attached: Option<&str>, in_range: bool) -> ReconcileAction {
    match (desired, attached) {
        (None, None) => ReconcileAction::None,
        (None, Some(_)) => ReconcileAction::Detach,
        (Some(_), None) if in_range => ReconcileAction::Attach,
        (Some(_), None) => ReconcileAction::None,
        (Some(_), Some(_)) if !in_range => ReconcileAction::Detach,
        (Some(wanted), Some(current)) if wanted != current => ReconcileAction::Attach,
        (Some(_), Some(_)) => ReconcileAction::None,
    }
}

/// Straight-line distance check. Ровно на границе - в range.
pub fn is_in_range(remote: Vec3, local: Vec3, range: f32) -> bool {
    remote.distance_squared(local) <= range * range
}

/// Resource: счётчики reconciliation (диагностика + тесты)
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub ticks: u64,
    pub attaches: u64,
    pub detaches: u64,
    pub failures: u64,
}

/// System: один tick reconciliation loop
///
/// Ошибка для одного игрока логируется и не мешает остальным.
///
/// NAMING: `_main_thread` суффикс = host API calls (NonSend resources)
pub fn reconcile_remote_players_main_thread(
    local: Query<&PlayerPosition, With<LocalPlayer>>,
    remotes: Query<(&Player, &PlayerPed, &PlayerPosition, &SyncedObject), Without<LocalPlayer>>,
    mut controller: ResMut<AttachmentController>,
    mut loads: ResMut<ResourceLoads>,
    registry: Res<ObjectRegistry>,
    config: Res<AttacherConfig>,
    mut stats: ResMut<ReconcileStats>,
    mut host: NonSendMut<HostBridge>,
) {
    stats.ticks += 1;

    let Ok(local_position) = local.single() else {
        // Local player ещё не пришёл от хоста
        return;
    };

    // Детерминированный порядок обхода
    let mut ordered: Vec<_> = remotes.iter().collect();
    ordered.sort_by_key(|(player, ..)| player.id);

    for (player, ped, position, synced) in ordered {
        let in_range = ped.0.is_some()
            && is_in_range(position.0, local_position.0, config.object_range);

        // Handle без живого entity (движок сам удалил prop) = нет attachment
        if let Some(handle) = controller.handle(player.id) {
            match host.engine.does_entity_exist(handle) {
                Ok(true) => {}
                Ok(false) => {
                    controller.forget(player.id);
                    logger::log_warning(&format!(
                        "reconcile: object {:?} of {:?} no longer exists",
                        handle, player.id
                    ));
                }
                Err(err) => {
                    stats.failures += 1;
                    logger::log_error(&format!("reconcile: entity check for {:?}: {}", player.id, err));
                    continue;
                }
            }
        }

        let attached_name = controller.get(player.id).map(|attached| attached.object_name.clone());

        let action = decide(synced.desired(), attached_name.as_deref(), in_range);
        let target = player_ref(player, ped, position);

        match action {
            ReconcileAction::None => {}
            ReconcileAction::Detach => match controller.detach(host.engine.as_mut(), &target) {
                Ok(_) => {
                    stats.detaches += 1;
                    logger::log(&format!("reconcile: detached object from {:?}", player.id));
                }
                Err(err) => {
                    stats.failures += 1;
                    report_attach_error("reconcile detach", &err);
                }
            },
            ReconcileAction::Attach => {
                let Some(object_name) = synced.desired() else {
                    continue;
                };

                // Новое имя не в registry: старый prop не должен остаться под чужим именем
                if attached_name.is_some() && !registry.contains(object_name) {
                    match controller.detach(host.engine.as_mut(), &target) {
                        Ok(_) => stats.detaches += 1,
                        Err(err) => report_attach_error("reconcile detach", &err),
                    }
                }

                match controller.attach_by_name(
                    host.engine.as_mut(),
                    &mut loads,
                    &registry,
                    &target,
                    object_name,
                ) {
                    Ok(handle) => {
                        stats.attaches += 1;
                        logger::log(&format!(
                            "reconcile: attached '{}' to {:?} ({:?})",
                            object_name, player.id, handle
                        ));
                    }
                    Err(err) => {
                        stats.failures += 1;
                        report_attach_error("reconcile attach", &err);
                    }
                }
            }
        }
    }
}
