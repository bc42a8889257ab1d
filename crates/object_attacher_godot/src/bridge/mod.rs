//! Мост между Godot и object_attacher ECS (100% Rust, GDScript только вызывает #[func])
//!
//! Архитектура:
//! - ready(): config + registry → App с Godot host'ами (NonSend HostBridge)
//! - GDScript регистрирует игроков / synced objects и шлёт client events
//! - Каждый frame: ECS update → outbox → signals (deferred)

mod logger;

use crate::debug_panel::DebugPanel;
use crate::host::{
    to_vec3, GodotDebugView, GodotEngine, GodotNetwork, GodotPlayer, GodotWorld, Outbound,
    SharedWorld,
};
use godot::classes::{Control, IControl, INode3D, InputEvent, InputEventKey, ProjectSettings};
use godot::global::Key;
use godot::obj::EngineEnum;
use godot::prelude::*;
use logger::GodotLogger;
use object_attacher::bridge::wire;
use object_attacher::{
    build_attacher_app, dispatch_client_event, AttacherConfig, AttachmentController, HostBridge,
    ObjectRegistry, PlayerId, ResourceLoads,
};
use serde_json::{json, Value};

const CONFIG_PATH: &str = "res://object_attacher.toml";

/// ObjectAttacherBridge: главный node для Godot ↔ ECS интеграции
///
/// # Signals
/// - `server_event(name, args_json)` - переслать на сервер (игровой networking)
/// - `debug_view_event(name, payload_json)`
/// - `game_controls_toggled(enabled)`
/// - `idle_cam_invalidated()`
#[derive(GodotClass)]
#[class(base=Node3D)]
pub struct ObjectAttacherBridge {
    base: Base<Node3D>,

    /// Bevy ECS App (attacher + NonSend host bridge)
    app: Option<bevy::app::App>,

    world: SharedWorld,

    /// Только при debug_mode
    panel: Option<Gd<DebugPanel>>,
}

#[godot_api]
impl INode3D for ObjectAttacherBridge {
    fn init(base: Base<Node3D>) -> Self {
        Self {
            base,
            app: None,
            world: GodotWorld::shared(),
            panel: None,
        }
    }

    fn ready(&mut self) {
        GodotLogger::clear_log_file();
        object_attacher::set_logger(Box::new(GodotLogger));

        let config = load_config();
        object_attacher::set_log_level(config.log_level());
        object_attacher::log("ObjectAttacherBridge ready");

        let registry = load_registry(&config);

        // 1. Godot host'ы поверх общего мира
        self.world.borrow_mut().root = Some(self.base().clone());
        let mut host = HostBridge::new(
            Box::new(GodotEngine::new(self.world.clone())),
            Box::new(GodotNetwork::new(self.world.clone())),
        );

        // 2. Debug view (panel) только в debug режиме
        if config.debug_mode {
            let panel = self.create_debug_panel();
            host = host.with_debug_view(Box::new(GodotDebugView::new(
                self.world.clone(),
                panel.clone().upcast::<Control>(),
            )));
            self.panel = Some(panel);
        }

        // 3. ECS App
        self.app = Some(build_attacher_app(config, registry, host));

        object_attacher::log("Object attacher ready: register players via register_player()");
    }

    fn process(&mut self, _delta: f64) {
        if let Some(app) = &mut self.app {
            app.update();
        }

        self.flush_outbox();
        self.update_panel_status();
    }

    fn unhandled_key_input(&mut self, event: Gd<InputEvent>) {
        let Some(key_event) = event.try_cast::<InputEventKey>().ok() else {
            return;
        };

        // keyup: released, не echo
        if key_event.is_pressed() || key_event.is_echo() {
            return;
        }

        if let Some(code) = virtual_key_code(key_event.get_keycode()) {
            self.key_up(code as i64);
        }
    }
}

#[godot_api]
impl ObjectAttacherBridge {
    #[signal]
    fn server_event(name: GString, args_json: GString);

    #[signal]
    fn debug_view_event(name: GString, payload_json: GString);

    #[signal]
    fn game_controls_toggled(enabled: bool);

    #[signal]
    fn idle_cam_invalidated();

    // === Players ===

    /// Local player (character node уже в scene tree)
    #[func]
    pub fn set_local_player(&mut self, id: i64, character: Gd<Node3D>) {
        let Some(id) = player_id(id) else {
            return;
        };
        self.register_player(id.0 as i64, character);
        self.world.borrow_mut().local_player = Some(id);
    }

    /// Remote (или local) player с character node
    #[func]
    pub fn register_player(&mut self, id: i64, character: Gd<Node3D>) {
        let Some(id) = player_id(id) else {
            return;
        };

        let mut world = self.world.borrow_mut();
        let position = to_vec3(character.get_global_position());
        let ped = world.register_ped(character);

        let previous = world.players.insert(
            id,
            GodotPlayer {
                ped: Some(ped),
                position,
                synced_object: None,
            },
        );

        // Повторная регистрация: synced object сохраняем, старый ped отпускаем
        if let Some(previous) = previous {
            if let Some(old_ped) = previous.ped {
                world.release_ped(old_ped);
            }
            if let Some(player) = world.players.get_mut(&id) {
                player.synced_object = previous.synced_object;
            }
        }
    }

    /// Character node удалён (streamed out), игрок остаётся в сессии
    #[func]
    pub fn stream_out_player(&mut self, id: i64, position: Vector3) {
        let Some(id) = player_id(id) else {
            return;
        };

        let mut world = self.world.borrow_mut();
        let old_ped = world.players.get_mut(&id).and_then(|player| {
            player.position = to_vec3(position);
            player.ped.take()
        });
        if let Some(old_ped) = old_ped {
            world.release_ped(old_ped);
        }
    }

    /// Игрок покинул сессию → PlayerDisconnected на следующем frame
    #[func]
    pub fn unregister_player(&mut self, id: i64) {
        let Some(id) = player_id(id) else {
            return;
        };

        let mut world = self.world.borrow_mut();
        if let Some(old_ped) = world.players.remove(&id).and_then(|player| player.ped) {
            world.release_ped(old_ped);
        }
        if world.local_player == Some(id) {
            world.local_player = None;
        }
    }

    /// Synced meta `AttachedObject` (пустая строка = нет объекта)
    #[func]
    pub fn set_synced_object(&mut self, id: i64, object_name: GString) {
        let Some(id) = player_id(id) else {
            return;
        };

        let object_name = object_name.to_string();
        if let Some(player) = self.world.borrow_mut().players.get_mut(&id) {
            player.synced_object = (!object_name.is_empty()).then_some(object_name);
        }
    }

    // === Client events ===

    /// Любой client event: `name` + JSON array аргументов
    #[func]
    pub fn client_event(&mut self, name: GString, args_json: GString) -> bool {
        let args = match serde_json::from_str::<Value>(&args_json.to_string()) {
            Ok(Value::Array(args)) => args,
            Ok(Value::Null) => Vec::new(),
            Ok(other) => vec![other],
            Err(err) => {
                object_attacher::log_warning(&format!("client_event {}: bad args JSON: {}", name, err));
                return false;
            }
        };

        self.dispatch(&name.to_string(), &args)
    }

    #[func]
    pub fn attach_object(&mut self, object_name: GString) {
        self.dispatch(wire::ATTACH_OBJECT, &[json!(object_name.to_string())]);
    }

    #[func]
    pub fn detach_object(&mut self) {
        self.dispatch(wire::DETACH_OBJECT, &[]);
    }

    #[func]
    pub fn key_up(&mut self, key: i64) {
        self.dispatch(wire::KEY_UP, &[json!(key)]);
    }

    #[func]
    pub fn console_command(&mut self, command: GString) {
        let args: Vec<Value> = command
            .to_string()
            .split_whitespace()
            .map(|part| json!(part))
            .collect();
        if args.is_empty() {
            return;
        }
        self.dispatch(wire::CONSOLE_COMMAND, &args);
    }

    // === Debug panel callbacks ===

    #[func]
    pub fn debug_request_registered_objects(&mut self) {
        self.dispatch(wire::DEBUG_REQUEST_REGISTERED_OBJECTS, &[]);
    }

    #[func]
    pub fn debug_detach_object(&mut self) {
        self.dispatch(wire::DEBUG_DETACH_OBJECT, &[]);
    }

    #[func]
    pub fn debug_reset_animation(&mut self) {
        self.dispatch(wire::DEBUG_RESET_ANIMATION, &[]);
    }

    /// Bone id → имя кости Skeleton3D (переопределение таблицы по умолчанию)
    #[func]
    pub fn register_bone(&mut self, bone_id: i32, bone_name: GString) {
        self.world
            .borrow_mut()
            .bone_names
            .insert(bone_id, bone_name.to_string());
    }

    // === Internal ===

    fn dispatch(&mut self, name: &str, args: &[Value]) -> bool {
        let Some(app) = &mut self.app else {
            object_attacher::log_error("ObjectAttacher not initialized!");
            return false;
        };

        dispatch_client_event(app.world_mut(), name, args).is_ok()
    }

    fn create_debug_panel(&mut self) -> Gd<DebugPanel> {
        let mut panel = Gd::<DebugPanel>::from_init_fn(|base| DebugPanel::init(base));

        // Path должен быть установлен ДО add_child (ready() подключает кнопки)
        let bridge_path = self.base().get_path().to_string();
        panel.bind_mut().bridge_path = bridge_path.as_str().into();

        self.base_mut().add_child(&panel.clone().upcast::<Node>());
        panel
    }

    /// Outbox → signals (call_deferred: обработчики могут звать bridge обратно)
    fn flush_outbox(&mut self) {
        let messages = self.world.borrow_mut().take_outbox();

        for message in messages {
            match message {
                Outbound::Server { event, args } => {
                    let args_json = Value::Array(args).to_string();
                    self.emit_deferred(
                        "server_event",
                        &[GString::from(event.as_str()).to_variant(), GString::from(args_json.as_str()).to_variant()],
                    );
                }
                Outbound::View { event, payload } => {
                    if event == wire::DEBUG_SET_REGISTERED_OBJECTS {
                        if let Some(panel) = self.panel.as_mut() {
                            panel.bind_mut().show_registered_objects(&payload);
                        }
                    }
                    let payload_json = payload.to_string();
                    self.emit_deferred(
                        "debug_view_event",
                        &[GString::from(event.as_str()).to_variant(), GString::from(payload_json.as_str()).to_variant()],
                    );
                }
                Outbound::GameControls(enabled) => {
                    self.emit_deferred("game_controls_toggled", &[enabled.to_variant()]);
                }
                Outbound::IdleCamInvalidated => {
                    self.emit_deferred("idle_cam_invalidated", &[]);
                }
            }
        }
    }

    fn emit_deferred(&mut self, signal: &str, args: &[Variant]) {
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(StringName::from(signal).to_variant());
        call_args.extend_from_slice(args);
        self.base_mut().call_deferred("emit_signal", &call_args);
    }

    fn update_panel_status(&mut self) {
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let Some(app) = &self.app else {
            return;
        };

        let world = self.world.borrow();
        let local = world
            .local_player
            .and_then(|id| app.world().resource::<AttachmentController>().get(id))
            .map(|object| object.object_name.clone())
            .unwrap_or_else(|| "-".to_string());
        let pending = app.world().resource::<ResourceLoads>().pending().len();

        let status = format!(
            "Object Attacher\nlocal object: {}\nplayers: {}  attached: {}  pending loads: {}\ncontrols: {}",
            local,
            world.players.len(),
            app.world().resource::<AttachmentController>().len(),
            pending,
            if world.game_controls_enabled { "game" } else { "cursor" },
        );
        drop(world);

        panel.bind_mut().set_status(&status);
    }
}

fn player_id(id: i64) -> Option<PlayerId> {
    match u32::try_from(id) {
        Ok(id) => Some(PlayerId(id)),
        Err(_) => {
            object_attacher::log_warning(&format!("invalid player id: {}", id));
            None
        }
    }
}

fn load_config() -> AttacherConfig {
    let path = ProjectSettings::singleton().globalize_path(CONFIG_PATH).to_string();
    match AttacherConfig::load_or_default(&path) {
        Ok(config) => config,
        Err(err) => {
            object_attacher::log_error(&format!("{}, using defaults", err));
            AttacherConfig::default()
        }
    }
}

fn load_registry(config: &AttacherConfig) -> ObjectRegistry {
    let res_path = format!("res://{}", config.registry_path);
    let path = ProjectSettings::singleton()
        .globalize_path(res_path.as_str())
        .to_string();

    match ObjectRegistry::from_file(&path) {
        Ok(registry) => {
            object_attacher::log_info(&format!("{} registered objects loaded", registry.len()));
            registry
        }
        Err(err) => {
            object_attacher::log_error(&format!("{}, registry is empty", err));
            ObjectRegistry::new()
        }
    }
}

/// Godot keycode → virtual key code (F1..F12 = 112..123, ASCII как есть)
fn virtual_key_code(key: Key) -> Option<u32> {
    let ord = key.ord();
    let f1 = Key::F1.ord();

    if (f1..=f1 + 11).contains(&ord) {
        return Some(112 + (ord - f1) as u32);
    }
    u32::try_from(ord).ok().filter(|code| *code < 256)
}
