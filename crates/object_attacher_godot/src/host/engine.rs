//! GodotEngine - EngineApi поверх scene tree
//!
//! NAMING: всё здесь вызывается только из `_main_thread` systems.

use super::{to_vector3, Outbound, SharedWorld, ANIMATIONS_DIR, PROPS_DIR};
use bevy::prelude::Vec3;
use godot::classes::{
    input, AnimationLibrary, AnimationPlayer, BoneAttachment3D, Input, Node3D, PackedScene,
    ResourceLoader, Skeleton3D,
};
use godot::prelude::*;
use object_attacher::host::joaat::joaat;
use object_attacher::host::HostResult;
use object_attacher::{
    AnimationTask, AttachOffsets, EngineApi, HostError, ModelHash, ObjectHandle, PedHandle,
};

/// Пути внутри character scene
const SKELETON_PATHS: [&str; 2] = ["Skeleton3D", "Armature/Skeleton3D"];
const ANIMATION_PLAYER_PATH: &str = "AnimationPlayer";
const WEAPON_PATH: &str = "Weapon";
/// Имя BoneAttachment3D holder'а для prop
const HOLDER_PREFIX: &str = "ObjectAttacher_";

pub struct GodotEngine {
    world: SharedWorld,
}

impl GodotEngine {
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }

    fn ped_node(&self, native: &'static str, ped: PedHandle) -> HostResult<Gd<Node3D>> {
        self.world.borrow().ped(ped).ok_or_else(|| HostError::NativeFailed {
            native,
            reason: format!("ped {:?} is not in the scene tree", ped),
        })
    }

    fn object_node(&self, object: ObjectHandle) -> HostResult<Gd<Node3D>> {
        self.world
            .borrow()
            .objects
            .get(&object.0)
            .filter(|node| node.is_instance_valid())
            .cloned()
            .ok_or(HostError::UnknownEntity(object.0))
    }

    fn model_path(&self, model: ModelHash) -> HostResult<String> {
        self.world
            .borrow()
            .model_paths
            .get(&model)
            .cloned()
            .ok_or_else(|| HostError::NativeFailed {
                native: "requestModel",
                reason: format!("unknown model hash {:#010x}", model.0),
            })
    }

    fn load_scene(&self, model: ModelHash) -> HostResult<Option<Gd<PackedScene>>> {
        if let Some(scene) = self.world.borrow().scenes.get(&model) {
            return Ok(Some(scene.clone()));
        }

        let path = self.model_path(model)?;
        let scene = ResourceLoader::singleton()
            .load(path.as_str())
            .and_then(|resource| resource.try_cast::<PackedScene>().ok());

        if let Some(scene) = &scene {
            self.world.borrow_mut().scenes.insert(model, scene.clone());
        }
        Ok(scene)
    }

    fn skeleton(ped: &Gd<Node3D>) -> Option<Gd<Skeleton3D>> {
        SKELETON_PATHS
            .iter()
            .find_map(|path| ped.try_get_node_as::<Skeleton3D>(*path))
    }

    fn animation_player(&self, native: &'static str, ped: PedHandle) -> HostResult<Gd<AnimationPlayer>> {
        let node = self.ped_node(native, ped)?;
        node.try_get_node_as::<AnimationPlayer>(ANIMATION_PLAYER_PATH)
            .ok_or_else(|| HostError::NativeFailed {
                native,
                reason: format!("ped {:?} has no {}", ped, ANIMATION_PLAYER_PATH),
            })
    }
}

fn anim_dict_path(dictionary: &str) -> String {
    format!("{}/{}.tres", ANIMATIONS_DIR, dictionary)
}

impl EngineApi for GodotEngine {
    /// joaat + запоминаем путь к сцене (hash → path)
    fn model_hash(&self, model: &str) -> ModelHash {
        let hash = ModelHash(joaat(model));
        self.world
            .borrow_mut()
            .model_paths
            .entry(hash)
            .or_insert_with(|| format!("{}/{}.tscn", PROPS_DIR, model));
        hash
    }

    fn request_model(&mut self, model: ModelHash) -> HostResult<()> {
        let path = self.model_path(model)?;
        if !ResourceLoader::singleton().exists(path.as_str()) {
            return Err(HostError::NativeFailed {
                native: "requestModel",
                reason: format!("{} does not exist", path),
            });
        }
        self.load_scene(model)?;
        Ok(())
    }

    fn has_model_loaded(&mut self, model: ModelHash) -> HostResult<bool> {
        Ok(self.world.borrow().scenes.contains_key(&model))
    }

    fn set_model_as_no_longer_needed(&mut self, model: ModelHash) -> HostResult<()> {
        // Instances держат свою ссылку на ресурс
        self.world.borrow_mut().scenes.remove(&model);
        Ok(())
    }

    fn create_object(&mut self, model: ModelHash, position: Vec3) -> HostResult<Option<ObjectHandle>> {
        let Some(scene) = self.load_scene(model)? else {
            return Ok(None);
        };
        let Some(mut node) = scene.try_instantiate_as::<Node3D>() else {
            return Ok(None);
        };

        let mut world = self.world.borrow_mut();
        let Some(mut root) = world.root.clone() else {
            node.queue_free();
            return Err(HostError::NativeFailed {
                native: "createObject",
                reason: "bridge root is not set".to_string(),
            });
        };

        root.add_child(&node);
        node.set_global_position(to_vector3(position));

        let handle = world.next_object;
        world.next_object += 1;
        world.objects.insert(handle, node);
        Ok(Some(ObjectHandle(handle)))
    }

    fn does_entity_exist(&mut self, object: ObjectHandle) -> HostResult<bool> {
        Ok(self.object_node(object).is_ok())
    }

    fn detach_entity(&mut self, object: ObjectHandle) -> HostResult<()> {
        let mut node = self.object_node(object)?;
        let Some(mut holder) = node.get_parent() else {
            return Ok(());
        };
        if !holder.get_name().to_string().starts_with(HOLDER_PREFIX) {
            return Ok(());
        }

        let transform = node.get_global_transform();
        holder.remove_child(&node);
        holder.queue_free();

        if let Some(mut root) = self.world.borrow().root.clone() {
            root.add_child(&node);
            node.set_global_transform(transform);
        }
        Ok(())
    }

    fn delete_object(&mut self, object: ObjectHandle) -> HostResult<()> {
        if let Some(mut node) = self.world.borrow_mut().objects.remove(&object.0) {
            if node.is_instance_valid() {
                node.queue_free();
            }
        }
        Ok(())
    }

    fn ped_bone_index(&mut self, ped: PedHandle, bone_id: i32) -> HostResult<i32> {
        let node = self.ped_node("getPedBoneIndex", ped)?;
        let Some(skeleton) = Self::skeleton(&node) else {
            return Err(HostError::NativeFailed {
                native: "getPedBoneIndex",
                reason: format!("ped {:?} has no Skeleton3D", ped),
            });
        };

        let bone_name = self.world.borrow().bone_names.get(&bone_id).cloned();
        // Неизвестный id → -1 (attach к корню skeleton)
        Ok(bone_name.map_or(-1, |name| skeleton.find_bone(name.as_str())))
    }

    fn set_ped_weapon_visible(&mut self, ped: PedHandle, visible: bool) -> HostResult<()> {
        let node = self.ped_node("setPedCurrentWeaponVisible", ped)?;
        if let Some(mut weapon) = node.try_get_node_as::<Node3D>(WEAPON_PATH) {
            weapon.set_visible(visible);
        }
        Ok(())
    }

    fn attach_entity_to_ped(
        &mut self,
        object: ObjectHandle,
        ped: PedHandle,
        bone_index: i32,
        offsets: AttachOffsets,
    ) -> HostResult<()> {
        let mut node = self.object_node(object)?;
        let ped_node = self.ped_node("attachEntityToEntity", ped)?;
        let Some(mut skeleton) = Self::skeleton(&ped_node) else {
            return Err(HostError::NativeFailed {
                native: "attachEntityToEntity",
                reason: format!("ped {:?} has no Skeleton3D", ped),
            });
        };

        // BoneAttachment3D следует за костью, prop - жёстко внутри него
        let mut holder = BoneAttachment3D::new_alloc();
        holder.set_name(format!("{}{}", HOLDER_PREFIX, object.0).as_str());
        if bone_index >= 0 {
            holder.set_bone_idx(bone_index);
        }
        skeleton.add_child(&holder);

        if let Some(mut parent) = node.get_parent() {
            parent.remove_child(&node);
        }
        holder.add_child(&node);
        node.set_position(to_vector3(offsets.position));
        node.set_rotation_degrees(to_vector3(offsets.rotation));
        Ok(())
    }

    fn does_anim_dict_exist(&mut self, dictionary: &str) -> HostResult<bool> {
        Ok(ResourceLoader::singleton().exists(anim_dict_path(dictionary).as_str()))
    }

    fn request_anim_dict(&mut self, dictionary: &str) -> HostResult<()> {
        if self.world.borrow().anim_libraries.contains_key(dictionary) {
            return Ok(());
        }

        let library = ResourceLoader::singleton()
            .load(anim_dict_path(dictionary).as_str())
            .and_then(|resource| resource.try_cast::<AnimationLibrary>().ok())
            .ok_or_else(|| HostError::NativeFailed {
                native: "requestAnimDict",
                reason: format!("failed to load {}", anim_dict_path(dictionary)),
            })?;

        self.world
            .borrow_mut()
            .anim_libraries
            .insert(dictionary.to_string(), library);
        Ok(())
    }

    fn has_anim_dict_loaded(&mut self, dictionary: &str) -> HostResult<bool> {
        Ok(self.world.borrow().anim_libraries.contains_key(dictionary))
    }

    fn task_play_anim(&mut self, ped: PedHandle, task: &AnimationTask) -> HostResult<()> {
        let mut player = self.animation_player("taskPlayAnim", ped)?;

        if !player.has_animation_library(task.dictionary.as_str()) {
            let library = self.world.borrow().anim_libraries.get(&task.dictionary).cloned();
            let Some(library) = library else {
                return Err(HostError::NativeFailed {
                    native: "taskPlayAnim",
                    reason: format!("dictionary {} is not loaded", task.dictionary),
                });
            };
            player.add_animation_library(task.dictionary.as_str(), &library);
        }

        // Blend speed 8.0 → 1/8 сек
        player.set_default_blend_time((1.0 / task.blend_in.max(f32::EPSILON)) as _);
        player.set_speed_scale(task.playback_rate);
        player
            .play_ex()
            .name(format!("{}/{}", task.dictionary, task.name).as_str())
            .done();
        Ok(())
    }

    fn clear_ped_tasks(&mut self, ped: PedHandle) -> HostResult<()> {
        let mut player = self.animation_player("clearPedTasks", ped)?;
        player.stop();
        Ok(())
    }

    fn invalidate_idle_cam(&mut self) -> HostResult<()> {
        self.world.borrow_mut().outbox.push(Outbound::IdleCamInvalidated);
        Ok(())
    }

    fn show_cursor(&mut self, visible: bool) -> HostResult<()> {
        let mode = if visible {
            input::MouseMode::VISIBLE
        } else {
            input::MouseMode::CAPTURED
        };
        Input::singleton().set_mouse_mode(mode);
        Ok(())
    }

    fn toggle_game_controls(&mut self, enabled: bool) -> HostResult<()> {
        let mut world = self.world.borrow_mut();
        world.game_controls_enabled = enabled;
        world.outbox.push(Outbound::GameControls(enabled));
        Ok(())
    }
}
