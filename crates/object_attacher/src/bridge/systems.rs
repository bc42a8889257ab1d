//! Event bridge systems: inbound events → controller / animation calls
//!
//! Все systems - `_main_thread` (host API через NonSend `HostBridge`).
//! Ошибки логируются, обработка остальных событий продолжается.

use super::events::{
    ConsoleCommand, DebugUiRequest, DebugViewEvent, KeyUp, LocalAttachmentChanged, ObjectRequest,
    ServerEvent,
};
use crate::animation;
use crate::attachment::{report_attach_error, AttachRequest, AttachmentController, PlayerRef};
use crate::config::AttacherConfig;
use crate::host::{EngineApi, HostBridge, HostResult};
use crate::loading::ResourceLoads;
use crate::logger;
use crate::players::{player_ref, LocalPlayer, Player, PlayerPed, PlayerPosition};
use crate::registry::ObjectRegistry;
use bevy::prelude::*;

/// Query: local player (максимум один)
pub type LocalPlayerQuery<'w, 's> =
    Query<'w, 's, (&'static Player, &'static PlayerPed, &'static PlayerPosition), With<LocalPlayer>>;

/// Input capture: cursor показан + game controls выключены
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InputCaptureState {
    pub cursor_active: bool,
}

fn local_player(local: &LocalPlayerQuery) -> Option<PlayerRef> {
    local
        .single()
        .ok()
        .map(|(player, ped, position)| player_ref(player, ped, position))
}

/// System: attach/detach запросы для local player
///
/// Attach зарегистрированного объекта → `ServerEvent::AttachedObject` (сервер
/// выставит synced object, остальные клиенты подхватят через reconciliation).
/// Detach → всегда `ServerEvent::DetachedObject`.
pub fn process_object_requests_main_thread(
    mut requests: EventReader<ObjectRequest>,
    local: LocalPlayerQuery,
    mut controller: ResMut<AttachmentController>,
    mut loads: ResMut<ResourceLoads>,
    registry: Res<ObjectRegistry>,
    mut host: NonSendMut<HostBridge>,
    mut server_events: EventWriter<ServerEvent>,
    mut changes: EventWriter<LocalAttachmentChanged>,
) {
    for request in requests.read() {
        let target = local_player(&local);
        if target.is_none() {
            logger::log_warning(&format!("{:?}: local player is not synced yet", request));
        }

        match request {
            ObjectRequest::Attach { object_name } => {
                if let Some(target) = target {
                    match controller.attach_by_name(
                        host.engine.as_mut(),
                        &mut loads,
                        &registry,
                        &target,
                        object_name,
                    ) {
                        Ok(handle) => {
                            logger::log(&format!("attached '{}' ({:?})", object_name, handle));
                            changes.write(LocalAttachmentChanged {
                                player: target.id,
                                object_name: Some(object_name.clone()),
                            });
                        }
                        Err(err) => report_attach_error("attachObject", &err),
                    }
                }

                if registry.contains(object_name) {
                    server_events.write(ServerEvent::AttachedObject(object_name.clone()));
                }
            }
            ObjectRequest::Detach => {
                if let Some(target) = target {
                    match controller.detach(host.engine.as_mut(), &target) {
                        Ok(true) => {
                            changes.write(LocalAttachmentChanged {
                                player: target.id,
                                object_name: None,
                            });
                        }
                        Ok(false) => {}
                        Err(err) => report_attach_error("detachObject", &err),
                    }
                }

                server_events.write(ServerEvent::DetachedObject);
            }
        }
    }
}

/// System: outbound server notifications → `NetworkApi::emit_server`
pub fn emit_server_events_main_thread(
    mut events: EventReader<ServerEvent>,
    mut host: NonSendMut<HostBridge>,
) {
    for event in events.read() {
        if let Err(err) = host.network.emit_server(event.wire_name(), &event.args()) {
            logger::log_error(&format!("emit {}: {}", event.wire_name(), err));
        }
    }
}

/// System: outbound debug view messages → `DebugViewApi::emit`
pub fn emit_debug_view_events_main_thread(
    mut events: EventReader<DebugViewEvent>,
    mut host: NonSendMut<HostBridge>,
) {
    for event in events.read() {
        let Some(view) = host.debug_view.as_mut() else {
            logger::log_warning(&format!("{}: no debug view attached", event.wire_name()));
            continue;
        };

        if let Err(err) = view.emit(event.wire_name(), event.payload()) {
            logger::log_error(&format!("emit {}: {}", event.wire_name(), err));
        }
    }
}

/// System: запросы debug view (только при `debug_mode`)
pub fn process_debug_requests_main_thread(
    mut requests: EventReader<DebugUiRequest>,
    config: Res<AttacherConfig>,
    local: LocalPlayerQuery,
    mut controller: ResMut<AttachmentController>,
    mut loads: ResMut<ResourceLoads>,
    registry: Res<ObjectRegistry>,
    mut host: NonSendMut<HostBridge>,
    mut view_events: EventWriter<DebugViewEvent>,
    mut changes: EventWriter<LocalAttachmentChanged>,
) {
    if !config.debug_mode {
        let ignored = requests.read().count();
        if ignored > 0 {
            logger::log_warning(&format!("{} debug request(s) ignored: debug_mode is off", ignored));
        }
        return;
    }

    for request in requests.read() {
        let target = local_player(&local);
        let engine = host.engine.as_mut();

        match request {
            DebugUiRequest::RequestRegisteredObjects => {
                view_events.write(DebugViewEvent::SetRegisteredObjects(registry.to_json()));
            }
            DebugUiRequest::AttachObject {
                object_name,
                bone_id,
                position,
                rotation,
            } => {
                let Some(target) = target else {
                    logger::log_warning("debug attach: local player is not synced yet");
                    continue;
                };

                let attach = AttachRequest::explicit(object_name.clone(), *bone_id, *position, *rotation);
                match controller.attach(engine, &mut loads, &target, &attach) {
                    Ok(_) => {
                        changes.write(LocalAttachmentChanged {
                            player: target.id,
                            object_name: Some(object_name.clone()),
                        });
                    }
                    Err(err) => report_attach_error("debug attach", &err),
                }
            }
            DebugUiRequest::DetachObject => {
                let Some(target) = target else {
                    continue;
                };

                match controller.detach(engine, &target) {
                    Ok(true) => {
                        changes.write(LocalAttachmentChanged {
                            player: target.id,
                            object_name: None,
                        });
                    }
                    Ok(false) => {}
                    Err(err) => report_attach_error("debug detach", &err),
                }
            }
            DebugUiRequest::ChangeAnimation {
                dictionary,
                name,
                flags,
            } => {
                let ped = target.and_then(|target| target.ped);
                if let Err(err) = animation::play(engine, &mut loads, ped, dictionary, name, *flags) {
                    logger::log_warning(&format!("changeAnimation {}/{}: {}", dictionary, name, err));
                }
            }
            DebugUiRequest::ResetAnimation => {
                let ped = target.and_then(|target| target.ped);
                if let Err(err) = animation::reset(engine, ped) {
                    logger::log_warning(&format!("resetAnimation: {}", err));
                }
            }
        }
    }
}

/// Переключить input capture: cursor ↔ game controls
pub fn toggle_cursor(engine: &mut dyn EngineApi, capture: &mut InputCaptureState) -> HostResult<()> {
    let active = capture.cursor_active;
    engine.show_cursor(!active)?;
    engine.toggle_game_controls(active)?;
    capture.cursor_active = !active;
    Ok(())
}

/// System: key up → cursor toggle (`cursor_toggle_key`, debug режим)
pub fn handle_key_up_main_thread(
    mut keys: EventReader<KeyUp>,
    config: Res<AttacherConfig>,
    mut capture: ResMut<InputCaptureState>,
    mut host: NonSendMut<HostBridge>,
) {
    if !config.debug_mode {
        keys.clear();
        return;
    }

    for key in keys.read() {
        if key.key != config.cursor_toggle_key {
            continue;
        }

        match toggle_cursor(host.engine.as_mut(), &mut capture) {
            Ok(()) => logger::log(&format!("cursor active: {}", capture.cursor_active)),
            Err(err) => logger::log_error(&format!("toggle cursor: {}", err)),
        }
    }
}

/// System: console command → debug view visibility toggle
pub fn handle_console_commands_main_thread(
    mut console: EventReader<ConsoleCommand>,
    config: Res<AttacherConfig>,
    mut host: NonSendMut<HostBridge>,
) {
    if !config.debug_mode {
        console.clear();
        return;
    }

    for command in console.read() {
        if command.command != config.console_command {
            continue;
        }

        let Some(view) = host.debug_view.as_mut() else {
            logger::log_warning(&format!("{}: no debug view attached", command.command));
            continue;
        };

        let visible = !view.is_visible();
        view.set_visible(visible);
        logger::log(&format!("debug view visible: {}", visible));
    }
}

/// System: idle-camera prevention (IdleCamUpdate schedule)
///
/// Работает только пока debug view видим.
pub fn prevent_idle_cam_main_thread(config: Res<AttacherConfig>, mut host: NonSendMut<HostBridge>) {
    if !config.debug_mode {
        return;
    }

    let view_visible = host.debug_view.as_ref().is_some_and(|view| view.is_visible());
    if !view_visible {
        return;
    }

    if let Err(err) = host.engine.invalidate_idle_cam() {
        logger::log_error(&format!("invalidate idle cam: {}", err));
    }
}
