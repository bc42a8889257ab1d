//! Event bridge: host events ↔ ECS
//!
//! # Inbound
//! Хост получает `(event name, JSON args)` → `decode_client_event` →
//! `ClientEvent::send_to(world)` → Bevy events:
//! - `ObjectRequest` - attach/detach на local player (+ notify server)
//! - `DebugUiRequest` - debug view (только `debug_mode`)
//! - `KeyUp` - cursor toggle
//! - `ConsoleCommand` - debug view visibility
//!
//! # Outbound
//! - `ServerEvent` → `NetworkApi::emit_server`
//! - `DebugViewEvent` → `DebugViewApi::emit`

pub mod decode;
pub mod events;
pub mod systems;

#[cfg(test)]
mod bridge_tests;

pub use decode::*;
pub use events::*;
pub use systems::*;
