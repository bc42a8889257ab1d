//! Object Attacher core
//!
//! Client-side attachment props к костям игроков (ECS на Bevy 0.16).
//!
//! HOST ABSTRACTION:
//! - ECS = attachment state, reconciliation, event routing
//! - Host (Godot GDExtension / headless) = engine natives, network, debug view
//!   через trait'ы `EngineApi` / `NetworkApi` / `DebugViewApi`
//!
//! # Schedules
//! - PreUpdate: player sync → disconnect cleanup
//! - FixedUpdate (60 Hz): tick counter → ReconcileUpdate / LoadPollUpdate / IdleCamUpdate
//! - Update: event bridge (inbound → controller → outbound)

use bevy::prelude::*;

// Публичные модули
pub mod animation;
pub mod attachment;
pub mod bridge;
pub mod config;
pub mod host;
pub mod loading;
pub mod logger;
pub mod players;
pub mod reconcile;
pub mod registry;
pub mod schedules;

// Re-export базовых типов для удобства
pub use attachment::{AttachError, AttachRequest, AttachedObject, AttachmentController, PlayerRef};
pub use bridge::{
    decode_client_event, ClientEvent, ConsoleCommand, DebugUiRequest, DebugViewEvent, DecodeError,
    InputCaptureState, KeyUp, LocalAttachmentChanged, ObjectRequest, ServerEvent,
};
pub use config::{AttacherConfig, ConfigError};
pub use host::{
    AnimationTask, AttachOffsets, DebugViewApi, EngineApi, HeadlessHost, HostBridge, HostError,
    ModelHash, NetworkApi, ObjectHandle, PedHandle, PlayerId, PlayerSnapshot,
};
pub use loading::{PendingLoad, ResourceLoads};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger,
    set_logger_if_needed, LogLevel, LogPrinter,
};
pub use players::{PlayerConnected, PlayerDisconnected};
pub use reconcile::ReconcileStats;
pub use registry::{ObjectDescriptor, ObjectRegistry, RegistryError};
pub use schedules::{
    FixedTickCounter, IdleCamUpdate, IntervalTicks, LoadPollUpdate, ReconcileUpdate, FIXED_HZ,
};

/// Главный plugin (resources, events, systems, custom schedules)
///
/// `AttacherConfig` / `ObjectRegistry` вставляются ДО plugin (иначе defaults).
/// `HostBridge` - NonSend resource, вставляет хост.
pub struct AttacherPlugin;

impl Plugin for AttacherPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AttacherConfig>()
            .init_resource::<ObjectRegistry>()
            .init_resource::<AttachmentController>()
            .init_resource::<ResourceLoads>()
            .init_resource::<ReconcileStats>()
            .init_resource::<InputCaptureState>()
            .init_resource::<players::PlayerIndex>();

        let intervals = IntervalTicks::from_config(app.world().resource::<AttacherConfig>());
        app.insert_resource(intervals);

        register_events(app);
        register_schedules(app);
        register_systems(app);
    }
}

fn register_events(app: &mut App) {
    app.add_event::<PlayerConnected>()
        .add_event::<PlayerDisconnected>()
        .add_event::<ObjectRequest>()
        .add_event::<DebugUiRequest>()
        .add_event::<KeyUp>()
        .add_event::<ConsoleCommand>()
        .add_event::<ServerEvent>()
        .add_event::<DebugViewEvent>()
        .add_event::<LocalAttachmentChanged>();
}

fn register_schedules(app: &mut App) {
    use schedules::timer_systems::{
        increment_tick_counter, run_idle_cam_timer, run_load_poll_timer, run_reconcile_timer,
    };

    // 1. Custom schedules + FixedTickCounter (tick-based timing)
    app.init_schedule(ReconcileUpdate);
    app.init_schedule(LoadPollUpdate);
    app.init_schedule(IdleCamUpdate);
    app.insert_resource(FixedTickCounter::default());
    app.insert_resource(Time::<Fixed>::from_hz(FIXED_HZ));

    // 2. Timer systems в FixedUpdate (.chain() - increment ПЕРВЫМ)
    app.add_systems(
        FixedUpdate,
        (
            increment_tick_counter,
            run_reconcile_timer,
            run_load_poll_timer,
            run_idle_cam_timer,
        )
            .chain(),
    );
}

fn register_systems(app: &mut App) {
    use attachment::cleanup_disconnected_players_main_thread;
    use bridge::{
        emit_debug_view_events_main_thread, emit_server_events_main_thread,
        handle_console_commands_main_thread, handle_key_up_main_thread,
        prevent_idle_cam_main_thread, process_debug_requests_main_thread,
        process_object_requests_main_thread,
    };
    use loading::poll_resource_loads_main_thread;
    use players::sync_players_from_host_main_thread;
    use reconcile::reconcile_remote_players_main_thread;

    // 1. PreUpdate: host snapshot → ECS (до FixedUpdate, reconcile видит свежие позиции)
    app.add_systems(
        PreUpdate,
        (
            sync_players_from_host_main_thread,
            cleanup_disconnected_players_main_thread,
        )
            .chain(),
    );

    // 2. Update: event bridge (inbound → outbound в том же frame)
    app.add_systems(
        Update,
        (
            process_object_requests_main_thread,
            process_debug_requests_main_thread,
            handle_key_up_main_thread,
            handle_console_commands_main_thread,
            emit_server_events_main_thread,
            emit_debug_view_events_main_thread,
        )
            .chain(),
    );

    // 3. Custom schedules
    app.add_systems(ReconcileUpdate, reconcile_remote_players_main_thread);
    app.add_systems(LoadPollUpdate, poll_resource_loads_main_thread);
    app.add_systems(IdleCamUpdate, prevent_idle_cam_main_thread);
}

/// Создаёт minimal Bevy App (без host и plugin)
pub fn create_headless_app() -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(Time::<Fixed>::from_hz(FIXED_HZ)); // 60Hz FixedUpdate

    app
}

/// Полный App: config + registry + host + `AttacherPlugin`
pub fn build_attacher_app(config: AttacherConfig, registry: ObjectRegistry, host: HostBridge) -> App {
    let mut app = create_headless_app();
    set_log_level(config.log_level());

    app.insert_resource(config)
        .insert_resource(registry)
        .insert_non_send_resource(host)
        .add_plugins(AttacherPlugin);

    app
}

/// Decode `(event name, args)` от хоста и отправить в ECS
///
/// Ошибка decoding логируется и возвращается вызывающему.
pub fn dispatch_client_event(
    world: &mut World,
    name: &str,
    args: &[serde_json::Value],
) -> Result<(), DecodeError> {
    match decode_client_event(name, args) {
        Ok(event) => {
            event.send_to(world);
            Ok(())
        }
        Err(err) => {
            log_warning(&format!("dropped client event: {}", err));
            Err(err)
        }
    }
}
