//! Godot host - реализация `EngineApi` / `NetworkApi` / `DebugViewApi`
//!
//! Все три реализации делят `Rc<RefCell<GodotWorld>>` с `ObjectAttacherBridge`:
//! bridge регистрирует игроков (#[func] из GDScript), host'ы читают/меняют
//! мир из ECS systems (main thread, NonSend).
//!
//! # Mapping
//! - Ped → character Node3D игрока (PedHandle = локальный счётчик)
//! - Model → `res://props/{model}.tscn` (PackedScene)
//! - Bone id → имя кости Skeleton3D (таблица `bone_names`)
//! - Anim dictionary → `res://animations/{dict}.tres` (AnimationLibrary)
//! - Server / debug view / game controls → `Outbound` очередь → signals

mod engine;
mod network;

pub use engine::GodotEngine;
pub use network::{GodotDebugView, GodotNetwork};

use bevy::prelude::Vec3;
use godot::classes::{AnimationLibrary, Node3D, PackedScene};
use godot::prelude::*;
use object_attacher::{ModelHash, PedHandle, PlayerId};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

pub type SharedWorld = Rc<RefCell<GodotWorld>>;

pub const PROPS_DIR: &str = "res://props";
pub const ANIMATIONS_DIR: &str = "res://animations";

/// Сообщения для GDScript (эмитятся bridge'ем после `app.update()`)
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Server {
        event: String,
        args: Vec<serde_json::Value>,
    },
    View {
        event: String,
        payload: serde_json::Value,
    },
    GameControls(bool),
    IdleCamInvalidated,
}

/// Игрок, зарегистрированный из GDScript
#[derive(Debug, Clone, Default)]
pub struct GodotPlayer {
    pub ped: Option<PedHandle>,
    /// Позиция для игроков без character node (streamed out)
    pub position: Vec3,
    pub synced_object: Option<String>,
}

pub struct GodotWorld {
    /// Родитель для заспавненных props (сам bridge node)
    pub root: Option<Gd<Node3D>>,
    pub local_player: Option<PlayerId>,
    pub players: BTreeMap<PlayerId, GodotPlayer>,

    peds: HashMap<u32, Gd<Node3D>>,
    next_ped: u32,
    objects: HashMap<u32, Gd<Node3D>>,
    next_object: u32,

    model_paths: HashMap<ModelHash, String>,
    scenes: HashMap<ModelHash, Gd<PackedScene>>,
    anim_libraries: HashMap<String, Gd<AnimationLibrary>>,

    /// Bone id (GTA skeleton ids) → имя кости в Skeleton3D
    pub bone_names: HashMap<i32, String>,

    pub game_controls_enabled: bool,
    pub outbox: Vec<Outbound>,
}

impl Default for GodotWorld {
    fn default() -> Self {
        Self {
            root: None,
            local_player: None,
            players: BTreeMap::new(),
            peds: HashMap::new(),
            next_ped: 1,
            objects: HashMap::new(),
            next_object: 1,
            model_paths: HashMap::new(),
            scenes: HashMap::new(),
            anim_libraries: HashMap::new(),
            bone_names: default_bone_names(),
            game_controls_enabled: true,
            outbox: Vec::new(),
        }
    }
}

impl GodotWorld {
    pub fn shared() -> SharedWorld {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Зарегистрировать character node → новый PedHandle
    pub fn register_ped(&mut self, node: Gd<Node3D>) -> PedHandle {
        let handle = self.next_ped;
        self.next_ped += 1;
        self.peds.insert(handle, node);
        PedHandle(handle)
    }

    pub fn release_ped(&mut self, ped: PedHandle) {
        self.peds.remove(&ped.0);
    }

    /// Ped node, если ещё жив
    pub fn ped(&self, ped: PedHandle) -> Option<Gd<Node3D>> {
        self.peds
            .get(&ped.0)
            .filter(|node| node.is_instance_valid())
            .cloned()
    }

    pub fn player_position(&self, player: &GodotPlayer) -> Vec3 {
        player
            .ped
            .and_then(|ped| self.ped(ped))
            .map(|node| to_vec3(node.get_global_position()))
            .unwrap_or(player.position)
    }

    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }
}

/// Стандартные GTA bone ids → имена костей humanoid skeleton (Godot retarget profile)
fn default_bone_names() -> HashMap<i32, String> {
    [
        (57005, "RightHand"), // SKEL_R_Hand
        (28422, "RightHand"), // PH_R_Hand
        (18905, "LeftHand"),  // SKEL_L_Hand
        (60309, "LeftHand"),  // PH_L_Hand
        (31086, "Head"),      // SKEL_Head
        (24818, "UpperChest"), // SKEL_Spine3
        (11816, "Hips"),      // SKEL_Pelvis
    ]
    .into_iter()
    .map(|(id, name)| (id, name.to_string()))
    .collect()
}

pub fn to_vec3(v: Vector3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_vector3(v: Vec3) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}
