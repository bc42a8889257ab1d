//! Event bridge integration test
//!
//! Client events идут тем же путём, что и от хоста:
//! `dispatch_client_event(name, args)` → ECS events → `app.update()`.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use object_attacher::bridge::wire;
use object_attacher::host::EngineCall;
use object_attacher::*;
use serde_json::{json, Value};
use std::time::Duration;

const LOCAL: PlayerId = PlayerId(1);
const LOCAL_PED: PedHandle = PedHandle(100);
const COFFEE_DICT: &str = "amb@world_human_drinking@coffee@male@idle_a";

fn test_registry() -> ObjectRegistry {
    ObjectRegistry::from_json_str(
        r#"{
            "beer": {
                "objectName": "prop_cs_beer_bot_01",
                "boneId": 57005,
                "position": { "x": 0.25, "y": 0.5, "z": 0.0 },
                "rotation": { "x": -90.0, "y": 0.0, "z": 0.0 }
            }
        }"#,
    )
    .expect("valid registry")
}

fn create_test_app(debug_mode: bool) -> (App, HeadlessHost) {
    let host = HeadlessHost::new();
    host.set_local_player(LOCAL, LOCAL_PED, Vec3::new(1.0, 2.0, 3.0));
    host.add_anim_dict(COFFEE_DICT);

    let config = AttacherConfig {
        debug_mode,
        ..Default::default()
    };
    let mut app = build_attacher_app(config, test_registry(), host.bridge_with_view());
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::ZERO));

    app.update();
    host.clear_calls();

    (app, host)
}

/// Helper: отправить client event и прогнать один frame
fn send(app: &mut App, name: &str, args: &[Value]) {
    dispatch_client_event(app.world_mut(), name, args).expect("event decodes");
    app.update();
}

fn local_object(app: &App) -> Option<String> {
    app.world()
        .resource::<AttachmentController>()
        .get(LOCAL)
        .map(|object| object.object_name.clone())
}

#[test]
fn test_attach_registered_object_notifies_server() {
    let (mut app, host) = create_test_app(false);

    send(&mut app, wire::ATTACH_OBJECT, &[json!("beer")]);

    assert_eq!(local_object(&app), Some("beer".to_string()));
    assert_eq!(
        host.server_events(),
        vec![(wire::ATTACHED_OBJECT.to_string(), vec![json!("beer")])]
    );
}

#[test]
fn test_attach_unregistered_object_is_silent() {
    let (mut app, host) = create_test_app(false);

    send(&mut app, wire::ATTACH_OBJECT, &[json!("doesNotExist")]);

    assert_eq!(local_object(&app), None);
    assert_eq!(host.calls(), vec![]);
    assert!(host.server_events().is_empty());
}

#[test]
fn test_detach_notifies_server() {
    let (mut app, host) = create_test_app(false);
    send(&mut app, wire::ATTACH_OBJECT, &[json!("beer")]);

    send(&mut app, wire::DETACH_OBJECT, &[]);

    assert_eq!(local_object(&app), None);
    assert_eq!(host.object_count(), 0);
    let events = host.server_events();
    assert_eq!(events.last(), Some(&(wire::DETACHED_OBJECT.to_string(), vec![])));
}

#[test]
fn test_attach_then_detach_in_same_frame_keeps_order() {
    let (mut app, host) = create_test_app(false);

    dispatch_client_event(app.world_mut(), wire::ATTACH_OBJECT, &[json!("beer")]).unwrap();
    dispatch_client_event(app.world_mut(), wire::DETACH_OBJECT, &[]).unwrap();
    app.update();

    assert_eq!(local_object(&app), None);
    assert_eq!(host.object_count(), 0);
    let names: Vec<String> = host.server_events().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec![wire::ATTACHED_OBJECT, wire::DETACHED_OBJECT]);
}

#[test]
fn test_debug_attach_bypasses_registry() {
    let (mut app, host) = create_test_app(true);

    let args = [
        json!("prop_cs_burger_01"),
        json!(18905),
        json!(0.5),
        json!(0.0),
        json!(0.0),
        json!(0.0),
        json!(90.0),
        json!(0.0),
    ];
    send(&mut app, wire::DEBUG_ATTACH_OBJECT, &args);

    assert_eq!(local_object(&app), Some("prop_cs_burger_01".to_string()));
    assert!(host.calls().contains(&EngineCall::AttachEntity {
        object: ObjectHandle(1),
        ped: LOCAL_PED,
        bone_index: 18905,
        offsets: AttachOffsets {
            position: Vec3::new(0.5, 0.0, 0.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
        },
    }));
    // Debug attach сервер не уведомляет
    assert!(host.server_events().is_empty());
}

#[test]
fn test_debug_requests_ignored_without_debug_mode() {
    let (mut app, host) = create_test_app(false);

    send(&mut app, wire::DEBUG_REQUEST_REGISTERED_OBJECTS, &[]);
    send(&mut app, wire::DEBUG_DETACH_OBJECT, &[]);

    assert!(host.view_events().is_empty());
    assert_eq!(host.calls(), vec![]);
}

#[test]
fn test_request_registered_objects_sends_registry_to_view() {
    let (mut app, host) = create_test_app(true);

    send(&mut app, wire::DEBUG_REQUEST_REGISTERED_OBJECTS, &[]);

    let events = host.view_events();
    assert_eq!(events.len(), 1);
    let (name, payload) = &events[0];
    assert_eq!(name, wire::DEBUG_SET_REGISTERED_OBJECTS);
    assert_eq!(payload["beer"]["objectName"], json!("prop_cs_beer_bot_01"));
    assert_eq!(payload["beer"]["boneId"], json!(57005));
}

#[test]
fn test_change_and_reset_animation() {
    let (mut app, host) = create_test_app(true);

    send(
        &mut app,
        wire::DEBUG_CHANGE_ANIMATION,
        &[json!(COFFEE_DICT), json!("idle_c"), json!(49)],
    );
    let task = host.state().active_animations.get(&LOCAL_PED).cloned();
    assert_eq!(task.map(|task| task.flags), Some(49));

    send(&mut app, wire::DEBUG_RESET_ANIMATION, &[]);
    assert!(host.state().active_animations.is_empty());
}

#[test]
fn test_unknown_animation_dictionary_plays_nothing() {
    let (mut app, host) = create_test_app(true);

    send(
        &mut app,
        wire::DEBUG_CHANGE_ANIMATION,
        &[json!("missing@dict"), json!("idle"), json!(0)],
    );

    assert!(host.state().active_animations.is_empty());
    assert_eq!(
        host.count_calls(|call| matches!(call, EngineCall::RequestAnimDict(_))),
        0
    );
}

#[test]
fn test_cursor_toggle_key() {
    let (mut app, host) = create_test_app(true);

    send(&mut app, wire::KEY_UP, &[json!(122)]);
    assert!(host.state().cursor_visible);
    assert!(!host.state().game_controls_enabled);
    assert!(app.world().resource::<InputCaptureState>().cursor_active);

    // Другая клавиша - ничего
    send(&mut app, wire::KEY_UP, &[json!(65)]);
    assert!(host.state().cursor_visible);

    send(&mut app, wire::KEY_UP, &[json!(122)]);
    assert!(!host.state().cursor_visible);
    assert!(host.state().game_controls_enabled);
}

#[test]
fn test_console_command_toggles_view_and_idle_cam() {
    let (mut app, host) = create_test_app(true);

    // View скрыт → idle cam не трогаем
    app.world_mut().run_schedule(IdleCamUpdate);
    assert_eq!(host.state().idle_cam_invalidations, 0);

    send(&mut app, wire::CONSOLE_COMMAND, &[json!("objectattacher")]);
    assert!(host.state().view_visible);

    app.world_mut().run_schedule(IdleCamUpdate);
    assert_eq!(host.state().idle_cam_invalidations, 1);

    send(&mut app, wire::CONSOLE_COMMAND, &[json!("objectattacher")]);
    assert!(!host.state().view_visible);

    send(&mut app, wire::CONSOLE_COMMAND, &[json!("somethingelse")]);
    assert!(!host.state().view_visible);
}

#[test]
fn test_malformed_event_is_rejected() {
    let (mut app, _host) = create_test_app(true);

    let err = dispatch_client_event(app.world_mut(), wire::DEBUG_CHANGE_ANIMATION, &[json!("dict")])
        .unwrap_err();

    assert_eq!(
        err,
        DecodeError::MissingArgument {
            event: wire::DEBUG_CHANGE_ANIMATION,
            index: 1
        }
    );
}
