//! Headless Object Attacher
//!
//! Прогоняет App с `HeadlessHost`: remote player подходит к local player,
//! получает объект, уходит из range → объект снимается.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use object_attacher::*;
use std::time::Duration;

const CONFIG_PATH: &str = "assets/object_attacher.toml";

fn main() {
    init_logger();

    let config = match AttacherConfig::load_or_default(CONFIG_PATH) {
        Ok(config) => config,
        Err(err) => {
            log_error(&format!("{}, using defaults", err));
            AttacherConfig::default()
        }
    };

    let registry = match ObjectRegistry::from_file(&config.registry_path) {
        Ok(registry) => registry,
        Err(err) => {
            log_warning(&format!("{}, using built-in demo registry", err));
            demo_registry()
        }
    };
    println!(
        "Starting Object Attacher headless demo ({} registered objects)",
        registry.len()
    );

    let host = HeadlessHost::new();
    host.set_local_player(PlayerId(1), PedHandle(100), Vec3::ZERO);
    host.add_player(PlayerId(2), Some(PedHandle(200)), Vec3::new(50.0, 0.0, 0.0));

    let desired = registry.names().next().map(str::to_string);
    host.set_synced_object(PlayerId(2), desired.as_deref());

    let mut app = build_attacher_app(config, registry, host.bridge_with_view());
    // Симулированное время: один FixedUpdate tick на update
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
        1.0 / FIXED_HZ,
    )));

    // 10 секунд @ 60 Hz: remote player идёт 50 → -10 по X
    for tick in 0..600u32 {
        let x = 50.0 - tick as f32 * 0.1;
        host.move_player(PlayerId(2), Vec3::new(x, 0.0, 0.0));

        app.update();

        if tick % 60 == 0 {
            let attached = app
                .world()
                .resource::<AttachmentController>()
                .get(PlayerId(2))
                .map(|object| object.object_name.clone());
            println!("Tick {}: remote x={:.1}, attached={:?}", tick, x, attached);
        }
    }

    let stats = app.world().resource::<ReconcileStats>().clone();
    println!(
        "Demo complete: {} reconcile ticks, {} attaches, {} detaches, {} failures",
        stats.ticks, stats.attaches, stats.detaches, stats.failures
    );
}

fn demo_registry() -> ObjectRegistry {
    let mut registry = ObjectRegistry::new();
    registry.add(ObjectDescriptor {
        name: "beer".to_string(),
        model: "prop_cs_beer_bot_01".to_string(),
        bone_id: 57005,
        position: Vec3::new(0.13, 0.02, 0.0),
        rotation: Vec3::new(-90.0, 0.0, 0.0),
    });
    registry
}
