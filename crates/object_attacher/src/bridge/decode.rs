//! Wire decoding: `(event name, JSON args)` → typed inbound event
//!
//! Хост получает события как имя + список аргументов (так их отдаёт
//! scripting/WebView слой). Decoding строгий: лишние аргументы
//! игнорируются, недостающие или неверного типа → `DecodeError`.

use super::events::{wire, ConsoleCommand, DebugUiRequest, KeyUp, ObjectRequest};
use bevy::prelude::{Vec3, World};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("{event}: missing argument #{index}")]
    MissingArgument { event: &'static str, index: usize },

    #[error("{event}: argument #{index} is not a {expected}")]
    InvalidArgument {
        event: &'static str,
        index: usize,
        expected: &'static str,
    },
}

/// Любое inbound событие после decoding
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Object(ObjectRequest),
    Debug(DebugUiRequest),
    KeyUp(KeyUp),
    Console(ConsoleCommand),
}

impl ClientEvent {
    /// Отправить в ECS как соответствующий Bevy event
    pub fn send_to(self, world: &mut World) {
        match self {
            ClientEvent::Object(request) => {
                world.send_event(request);
            }
            ClientEvent::Debug(request) => {
                world.send_event(request);
            }
            ClientEvent::KeyUp(key) => {
                world.send_event(key);
            }
            ClientEvent::Console(command) => {
                world.send_event(command);
            }
        }
    }
}

pub fn decode_client_event(name: &str, args: &[Value]) -> Result<ClientEvent, DecodeError> {
    let event = match name {
        wire::ATTACH_OBJECT => ClientEvent::Object(ObjectRequest::Attach {
            object_name: arg_string(wire::ATTACH_OBJECT, args, 0)?,
        }),
        wire::DETACH_OBJECT => ClientEvent::Object(ObjectRequest::Detach),

        wire::DEBUG_REQUEST_REGISTERED_OBJECTS => {
            ClientEvent::Debug(DebugUiRequest::RequestRegisteredObjects)
        }
        wire::DEBUG_ATTACH_OBJECT => {
            let event = wire::DEBUG_ATTACH_OBJECT;
            ClientEvent::Debug(DebugUiRequest::AttachObject {
                object_name: arg_string(event, args, 0)?,
                bone_id: arg_i32(event, args, 1)?,
                position: Vec3::new(
                    arg_f32(event, args, 2)?,
                    arg_f32(event, args, 3)?,
                    arg_f32(event, args, 4)?,
                ),
                rotation: Vec3::new(
                    arg_f32(event, args, 5)?,
                    arg_f32(event, args, 6)?,
                    arg_f32(event, args, 7)?,
                ),
            })
        }
        wire::DEBUG_DETACH_OBJECT => ClientEvent::Debug(DebugUiRequest::DetachObject),
        wire::DEBUG_CHANGE_ANIMATION => {
            let event = wire::DEBUG_CHANGE_ANIMATION;
            ClientEvent::Debug(DebugUiRequest::ChangeAnimation {
                dictionary: arg_string(event, args, 0)?,
                name: arg_string(event, args, 1)?,
                flags: arg_i32(event, args, 2)?,
            })
        }
        wire::DEBUG_RESET_ANIMATION => ClientEvent::Debug(DebugUiRequest::ResetAnimation),

        wire::KEY_UP => {
            let key = arg_i64(wire::KEY_UP, args, 0)?;
            let key = u32::try_from(key).map_err(|_| DecodeError::InvalidArgument {
                event: wire::KEY_UP,
                index: 0,
                expected: "key code",
            })?;
            ClientEvent::KeyUp(KeyUp { key })
        }
        wire::CONSOLE_COMMAND => {
            let command = arg_string(wire::CONSOLE_COMMAND, args, 0)?;
            let rest = args.get(1..).unwrap_or_default();
            let args = rest
                .iter()
                .map(|value| match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect();
            ClientEvent::Console(ConsoleCommand { command, args })
        }

        unknown => return Err(DecodeError::UnknownEvent(unknown.to_string())),
    };

    Ok(event)
}

fn arg<'a>(event: &'static str, args: &'a [Value], index: usize) -> Result<&'a Value, DecodeError> {
    args.get(index)
        .ok_or(DecodeError::MissingArgument { event, index })
}

fn arg_string(event: &'static str, args: &[Value], index: usize) -> Result<String, DecodeError> {
    arg(event, args, index)?
        .as_str()
        .map(str::to_string)
        .ok_or(DecodeError::InvalidArgument {
            event,
            index,
            expected: "string",
        })
}

/// Целое; WebView присылает числа как f64 → принимаем и 49.0
fn arg_i64(event: &'static str, args: &[Value], index: usize) -> Result<i64, DecodeError> {
    let value = arg(event, args, index)?;
    let invalid = DecodeError::InvalidArgument {
        event,
        index,
        expected: "integer",
    };

    if let Some(int) = value.as_i64() {
        return Ok(int);
    }

    match value.as_f64() {
        Some(float) if float.fract() == 0.0 => Ok(float as i64),
        _ => Err(invalid),
    }
}

fn arg_i32(event: &'static str, args: &[Value], index: usize) -> Result<i32, DecodeError> {
    let value = arg_i64(event, args, index)?;
    i32::try_from(value).map_err(|_| DecodeError::InvalidArgument {
        event,
        index,
        expected: "32-bit integer",
    })
}

fn arg_f32(event: &'static str, args: &[Value], index: usize) -> Result<f32, DecodeError> {
    arg(event, args, index)?
        .as_f64()
        .map(|value| value as f32)
        .ok_or(DecodeError::InvalidArgument {
            event,
            index,
            expected: "number",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_attach_object() {
        let event = decode_client_event(wire::ATTACH_OBJECT, &[json!("beer")]).unwrap();
        assert_eq!(
            event,
            ClientEvent::Object(ObjectRequest::Attach {
                object_name: "beer".into()
            })
        );
    }

    #[test]
    fn test_decode_debug_attach_with_offsets() {
        let args = [
            json!("prop_cs_beer_bot_01"),
            json!(57005),
            json!(0.25),
            json!(0.5),
            json!(0.0),
            json!(-90.0),
            json!(0),
            json!(0.0),
        ];

        let event = decode_client_event(wire::DEBUG_ATTACH_OBJECT, &args).unwrap();

        let ClientEvent::Debug(DebugUiRequest::AttachObject {
            object_name,
            bone_id,
            position,
            rotation,
        }) = event
        else {
            panic!("expected debug attach request");
        };
        assert_eq!(object_name, "prop_cs_beer_bot_01");
        assert_eq!(bone_id, 57005);
        assert_eq!(position, Vec3::new(0.25, 0.5, 0.0));
        assert_eq!(rotation, Vec3::new(-90.0, 0.0, 0.0));
    }

    #[test]
    fn test_decode_animation_flag_accepts_whole_float() {
        let args = [json!("dict"), json!("anim"), json!(49.0)];
        let event = decode_client_event(wire::DEBUG_CHANGE_ANIMATION, &args).unwrap();
        assert_eq!(
            event,
            ClientEvent::Debug(DebugUiRequest::ChangeAnimation {
                dictionary: "dict".into(),
                name: "anim".into(),
                flags: 49,
            })
        );
    }

    #[test]
    fn test_decode_missing_argument() {
        let err = decode_client_event(wire::DEBUG_ATTACH_OBJECT, &[json!("hat"), json!(1)]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingArgument {
                event: wire::DEBUG_ATTACH_OBJECT,
                index: 2
            }
        );
    }

    #[test]
    fn test_decode_invalid_argument_type() {
        let err = decode_client_event(wire::ATTACH_OBJECT, &[json!(5)]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidArgument { index: 0, .. }));

        let err = decode_client_event(wire::KEY_UP, &[json!(-1)]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidArgument { .. }));
    }

    #[test]
    fn test_decode_unknown_event() {
        let err = decode_client_event("objectAttacher:explode", &[]).unwrap_err();
        assert_eq!(err, DecodeError::UnknownEvent("objectAttacher:explode".into()));
    }

    #[test]
    fn test_decode_console_command_with_args() {
        let args = [json!("objectattacher"), json!("show"), json!(2)];
        let event = decode_client_event(wire::CONSOLE_COMMAND, &args).unwrap();
        assert_eq!(
            event,
            ClientEvent::Console(ConsoleCommand {
                command: "objectattacher".into(),
                args: vec!["show".into(), "2".into()],
            })
        );
    }
}
