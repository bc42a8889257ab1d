//! Host API - граница между core и игровым движком
//!
//! Core не знает ничего про конкретный движок. Всё что требуется от хоста
//! описано тремя trait'ами:
//! - `EngineApi` - natives (модели, entity, кости, анимации, курсор)
//! - `NetworkApi` - игроки, synced meta, emit на сервер
//! - `DebugViewApi` - debug WebView (только при `debug_mode`)
//!
//! Все три живут в `HostBridge` - NonSend resource (main thread only),
//! так как реальные handles движка (Gd<T> и т.п.) не Send.

pub mod headless;
pub mod joaat;

use bevy::prelude::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use headless::{EngineCall, HeadlessHost};

/// Stable идентификатор игрока (выдаётся хостом, уникален среди подключённых)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Handle персонажа игрока в движке (script id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PedHandle(pub u32);

/// Handle заспавненного prop объекта (никогда не 0 - 0 означает "null" у движка)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u32);

/// Идентификатор модели, resolved из имени
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHash(pub u32);

/// Offsets для жёсткого attach к кости
///
/// `rotation` - градусы (euler). Attach всегда rigid: без относительного
/// движения и без коллизии между prop и персонажем.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachOffsets {
    pub position: Vec3,
    pub rotation: Vec3,
}

/// Параметры play-animation task
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTask {
    pub dictionary: String,
    pub name: String,
    pub blend_in: f32,
    pub blend_out: f32,
    /// -1 = бесконечно
    pub duration_ms: i32,
    pub flags: i32,
    pub playback_rate: f32,
}

/// Снимок одного игрока от networking layer
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    /// None - игрок не streamed in (нет entity у движка)
    pub ped: Option<PedHandle>,
    pub position: Vec3,
    /// Synced meta "AttachedObject" (пустая строка = нет объекта)
    pub synced_object: Option<String>,
}

/// Ошибка host call (native бросил исключение / вернул мусор)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("native `{native}` failed: {reason}")]
    NativeFailed { native: &'static str, reason: String },

    #[error("unknown entity handle {0}")]
    UnknownEntity(u32),

    #[error("network emit `{event}` failed: {reason}")]
    EmitFailed { event: String, reason: String },
}

pub type HostResult<T> = Result<T, HostError>;

/// Engine natives, которые нужны attach/animation логике
pub trait EngineApi {
    /// Resolve имени модели в engine identifier
    fn model_hash(&self, model: &str) -> ModelHash {
        ModelHash(joaat::joaat(model))
    }

    fn request_model(&mut self, model: ModelHash) -> HostResult<()>;
    fn has_model_loaded(&mut self, model: ModelHash) -> HostResult<bool>;
    /// Release памяти модели (после того как load завершился)
    fn set_model_as_no_longer_needed(&mut self, model: ModelHash) -> HostResult<()>;

    /// Spawn prop. `Ok(None)` - движок вернул null handle.
    fn create_object(&mut self, model: ModelHash, position: Vec3) -> HostResult<Option<ObjectHandle>>;
    fn does_entity_exist(&mut self, object: ObjectHandle) -> HostResult<bool>;
    fn detach_entity(&mut self, object: ObjectHandle) -> HostResult<()>;
    fn delete_object(&mut self, object: ObjectHandle) -> HostResult<()>;

    fn ped_bone_index(&mut self, ped: PedHandle, bone_id: i32) -> HostResult<i32>;
    fn set_ped_weapon_visible(&mut self, ped: PedHandle, visible: bool) -> HostResult<()>;
    fn attach_entity_to_ped(
        &mut self,
        object: ObjectHandle,
        ped: PedHandle,
        bone_index: i32,
        offsets: AttachOffsets,
    ) -> HostResult<()>;

    fn does_anim_dict_exist(&mut self, dictionary: &str) -> HostResult<bool>;
    fn request_anim_dict(&mut self, dictionary: &str) -> HostResult<()>;
    fn has_anim_dict_loaded(&mut self, dictionary: &str) -> HostResult<bool>;
    fn task_play_anim(&mut self, ped: PedHandle, task: &AnimationTask) -> HostResult<()>;
    fn clear_ped_tasks(&mut self, ped: PedHandle) -> HostResult<()>;

    fn invalidate_idle_cam(&mut self) -> HostResult<()>;
    fn show_cursor(&mut self, visible: bool) -> HostResult<()>;
    fn toggle_game_controls(&mut self, enabled: bool) -> HostResult<()>;
}

/// Networking / meta-sync layer
pub trait NetworkApi {
    fn local_player(&self) -> Option<PlayerId>;
    /// Все подключённые игроки (включая local)
    fn players(&self) -> Vec<PlayerSnapshot>;
    fn emit_server(&mut self, event: &str, args: &[serde_json::Value]) -> HostResult<()>;
}

/// Debug WebView
pub trait DebugViewApi {
    fn emit(&mut self, event: &str, payload: serde_json::Value) -> HostResult<()>;
    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
}

/// NonSend resource: все host trait objects (main thread only)
pub struct HostBridge {
    pub engine: Box<dyn EngineApi>,
    pub network: Box<dyn NetworkApi>,
    /// Есть только если debug_mode включён и хост поддерживает view
    pub debug_view: Option<Box<dyn DebugViewApi>>,
}

impl HostBridge {
    pub fn new(engine: Box<dyn EngineApi>, network: Box<dyn NetworkApi>) -> Self {
        Self {
            engine,
            network,
            debug_view: None,
        }
    }

    pub fn with_debug_view(mut self, view: Box<dyn DebugViewApi>) -> Self {
        self.debug_view = Some(view);
        self
    }
}
