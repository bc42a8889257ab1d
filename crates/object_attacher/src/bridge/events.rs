//! Event bridge events
//!
//! Inbound события генерируются хостом (client events, debug view, input,
//! console) и обрабатываются ECS systems. Outbound события собираются
//! systems и уходят к серверу / в debug view.

use crate::host::PlayerId;
use bevy::prelude::{Event, Vec3};
use serde_json::Value;

/// Wire names (alt:V-style event names)
pub mod wire {
    pub const ATTACH_OBJECT: &str = "objectAttacher:attachObject";
    pub const DETACH_OBJECT: &str = "objectAttacher:detachObject";

    pub const ATTACHED_OBJECT: &str = "objectAttacher:attachedObject";
    pub const DETACHED_OBJECT: &str = "objectAttacher:detachedObject";

    pub const DEBUG_REQUEST_REGISTERED_OBJECTS: &str = "objectAttacher:debug:requestRegisteredObjects";
    pub const DEBUG_SET_REGISTERED_OBJECTS: &str = "objectAttacher:debug:setRegisteredObjects";
    pub const DEBUG_ATTACH_OBJECT: &str = "objectAttacher:debug:attachObject";
    pub const DEBUG_DETACH_OBJECT: &str = "objectAttacher:debug:detachObject";
    pub const DEBUG_CHANGE_ANIMATION: &str = "objectAttacher:debug:changeAnimation";
    pub const DEBUG_RESET_ANIMATION: &str = "objectAttacher:debug:resetAnimation";

    pub const KEY_UP: &str = "keyup";
    pub const CONSOLE_COMMAND: &str = "consoleCommand";
}

/// Local player request (client event)
///
/// Один enum на оба запроса: порядок attach/detach внутри frame сохраняется.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum ObjectRequest {
    /// Attach registered object к local player + notify server
    Attach { object_name: String },
    /// Detach с local player + notify server
    Detach,
}

/// Запрос из debug view (обрабатывается только при `debug_mode`)
#[derive(Event, Debug, Clone, PartialEq)]
pub enum DebugUiRequest {
    RequestRegisteredObjects,
    /// Explicit attach в обход registry (live tuning offsets)
    AttachObject {
        object_name: String,
        bone_id: i32,
        position: Vec3,
        rotation: Vec3,
    },
    DetachObject,
    ChangeAnimation {
        dictionary: String,
        name: String,
        flags: i32,
    },
    ResetAnimation,
}

/// Key released (virtual key code)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUp {
    pub key: u32,
}

/// Console command (первое слово + аргументы)
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct ConsoleCommand {
    pub command: String,
    pub args: Vec<String>,
}

/// Outbound: notify server
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    AttachedObject(String),
    DetachedObject,
}

impl ServerEvent {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ServerEvent::AttachedObject(_) => wire::ATTACHED_OBJECT,
            ServerEvent::DetachedObject => wire::DETACHED_OBJECT,
        }
    }

    pub fn args(&self) -> Vec<Value> {
        match self {
            ServerEvent::AttachedObject(name) => vec![Value::String(name.clone())],
            ServerEvent::DetachedObject => Vec::new(),
        }
    }
}

/// Outbound: сообщение в debug view
#[derive(Event, Debug, Clone, PartialEq)]
pub enum DebugViewEvent {
    /// Registry в исходном JSON формате (`{name: {objectName, boneId, ...}}`)
    SetRegisteredObjects(Value),
}

impl DebugViewEvent {
    pub fn wire_name(&self) -> &'static str {
        match self {
            DebugViewEvent::SetRegisteredObjects(_) => wire::DEBUG_SET_REGISTERED_OBJECTS,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            DebugViewEvent::SetRegisteredObjects(registry) => registry.clone(),
        }
    }
}

/// Attach/detach, выполненный для local player (диагностика + debug panel)
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct LocalAttachmentChanged {
    pub player: PlayerId,
    pub object_name: Option<String>,
}
