//! Headless host - in-memory реализация всех host trait'ов
//!
//! Используется headless demo binary и тестами. Записывает каждый native
//! call в `EngineCall` log, хранит игроков/entity в `HeadlessState`.
//!
//! `HeadlessHost` - cheap clone (Rc), так что тест держит свой handle и
//! меняет состояние мира между `app.update()`.

use super::{
    AnimationTask, AttachOffsets, DebugViewApi, EngineApi, HostBridge, HostError, HostResult,
    ModelHash, NetworkApi, ObjectHandle, PedHandle, PlayerId, PlayerSnapshot,
};
use bevy::prelude::Vec3;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Запись одного native call (для assert'ов в тестах)
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    RequestModel(ModelHash),
    HasModelLoaded(ModelHash),
    ReleaseModel(ModelHash),
    CreateObject { model: ModelHash, position: Vec3 },
    DoesEntityExist(ObjectHandle),
    DetachEntity(ObjectHandle),
    DeleteObject(ObjectHandle),
    PedBoneIndex { ped: PedHandle, bone_id: i32 },
    SetWeaponVisible { ped: PedHandle, visible: bool },
    AttachEntity {
        object: ObjectHandle,
        ped: PedHandle,
        bone_index: i32,
        offsets: AttachOffsets,
    },
    DoesAnimDictExist(String),
    RequestAnimDict(String),
    HasAnimDictLoaded(String),
    PlayAnim { ped: PedHandle, task: AnimationTask },
    ClearTasks(PedHandle),
    InvalidateIdleCam,
    ShowCursor(bool),
    ToggleGameControls(bool),
}

impl EngineCall {
    /// Вызовы, которые меняют состояние мира (без read-only queries)
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            EngineCall::HasModelLoaded(_)
                | EngineCall::DoesEntityExist(_)
                | EngineCall::PedBoneIndex { .. }
                | EngineCall::DoesAnimDictExist(_)
                | EngineCall::HasAnimDictLoaded(_)
        )
    }
}

/// Заспавненный prop в headless мире
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessObject {
    pub model: ModelHash,
    pub position: Vec3,
    pub attached_to: Option<(PedHandle, i32, AttachOffsets)>,
}

#[derive(Debug, Default)]
pub struct HeadlessState {
    pub calls: Vec<EngineCall>,
    pub players: Vec<PlayerSnapshot>,
    pub local_player: Option<PlayerId>,
    pub objects: HashMap<u32, HeadlessObject>,
    next_object: u32,

    /// true → request_model / request_anim_dict завершаются сразу
    pub instant_loading: bool,
    pub requested_models: HashSet<ModelHash>,
    pub loaded_models: HashSet<ModelHash>,
    pub requested_dicts: HashSet<String>,
    pub loaded_dicts: HashSet<String>,
    pub known_anim_dicts: HashSet<String>,

    /// Имитация null handle от create_object
    pub fail_object_creation: bool,
    /// Имитация исключения в конкретном native
    pub failing_native: Option<&'static str>,

    pub hidden_weapons: HashSet<PedHandle>,
    pub active_animations: HashMap<PedHandle, AnimationTask>,
    pub cursor_visible: bool,
    pub game_controls_enabled: bool,
    pub idle_cam_invalidations: u32,

    pub server_events: Vec<(String, Vec<serde_json::Value>)>,
    pub view_events: Vec<(String, serde_json::Value)>,
    pub view_visible: bool,
}

#[derive(Clone)]
pub struct HeadlessHost {
    state: Rc<RefCell<HeadlessState>>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        let state = HeadlessState {
            instant_loading: true,
            game_controls_enabled: true,
            next_object: 1,
            ..Default::default()
        };

        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// HostBridge поверх этого мира (engine + network, без debug view)
    pub fn bridge(&self) -> HostBridge {
        HostBridge::new(Box::new(self.clone()), Box::new(self.clone()))
    }

    /// HostBridge с debug view (для debug_mode)
    pub fn bridge_with_view(&self) -> HostBridge {
        self.bridge().with_debug_view(Box::new(self.clone()))
    }

    pub fn state(&self) -> std::cell::Ref<'_, HeadlessState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> std::cell::RefMut<'_, HeadlessState> {
        self.state.borrow_mut()
    }

    // === World setup ===

    pub fn set_local_player(&self, id: PlayerId, ped: PedHandle, position: Vec3) {
        self.add_player(id, Some(ped), position);
        self.state.borrow_mut().local_player = Some(id);
    }

    pub fn add_player(&self, id: PlayerId, ped: Option<PedHandle>, position: Vec3) {
        let mut state = self.state.borrow_mut();
        state.players.retain(|p| p.id != id);
        state.players.push(PlayerSnapshot {
            id,
            ped,
            position,
            synced_object: None,
        });
    }

    pub fn remove_player(&self, id: PlayerId) {
        self.state.borrow_mut().players.retain(|p| p.id != id);
    }

    pub fn move_player(&self, id: PlayerId, position: Vec3) {
        if let Some(player) = self.state.borrow_mut().players.iter_mut().find(|p| p.id == id) {
            player.position = position;
        }
    }

    pub fn set_player_ped(&self, id: PlayerId, ped: Option<PedHandle>) {
        if let Some(player) = self.state.borrow_mut().players.iter_mut().find(|p| p.id == id) {
            player.ped = ped;
        }
    }

    pub fn set_synced_object(&self, id: PlayerId, object: Option<&str>) {
        if let Some(player) = self.state.borrow_mut().players.iter_mut().find(|p| p.id == id) {
            player.synced_object = object.map(str::to_string);
        }
    }

    pub fn add_anim_dict(&self, dictionary: &str) {
        self.state.borrow_mut().known_anim_dicts.insert(dictionary.to_string());
    }

    /// Выключить мгновенную загрузку - ресурсы грузятся только через `finish_loading_*`
    pub fn set_instant_loading(&self, instant: bool) {
        self.state.borrow_mut().instant_loading = instant;
    }

    pub fn finish_loading_model(&self, model: ModelHash) {
        self.state.borrow_mut().loaded_models.insert(model);
    }

    pub fn finish_loading_dict(&self, dictionary: &str) {
        self.state.borrow_mut().loaded_dicts.insert(dictionary.to_string());
    }

    /// Удалить entity "снаружи" (движок сам почистил объект)
    pub fn destroy_object_externally(&self, object: ObjectHandle) {
        self.state.borrow_mut().objects.remove(&object.0);
    }

    // === Inspection ===

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn count_calls(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<HeadlessObject> {
        self.state.borrow().objects.get(&handle.0).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    pub fn server_events(&self) -> Vec<(String, Vec<serde_json::Value>)> {
        self.state.borrow().server_events.clone()
    }

    pub fn view_events(&self) -> Vec<(String, serde_json::Value)> {
        self.state.borrow().view_events.clone()
    }

    // === Internal ===

    fn record(&self, call: EngineCall) -> HostResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        Ok(())
    }

    fn check_native(&self, native: &'static str) -> HostResult<()> {
        if self.state.borrow().failing_native == Some(native) {
            return Err(HostError::NativeFailed {
                native,
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl EngineApi for HeadlessHost {
    fn request_model(&mut self, model: ModelHash) -> HostResult<()> {
        self.check_native("requestModel")?;
        self.record(EngineCall::RequestModel(model))?;
        let mut state = self.state.borrow_mut();
        state.requested_models.insert(model);
        if state.instant_loading {
            state.loaded_models.insert(model);
        }
        Ok(())
    }

    fn has_model_loaded(&mut self, model: ModelHash) -> HostResult<bool> {
        self.record(EngineCall::HasModelLoaded(model))?;
        Ok(self.state.borrow().loaded_models.contains(&model))
    }

    fn set_model_as_no_longer_needed(&mut self, model: ModelHash) -> HostResult<()> {
        self.record(EngineCall::ReleaseModel(model))?;
        self.state.borrow_mut().requested_models.remove(&model);
        Ok(())
    }

    fn create_object(&mut self, model: ModelHash, position: Vec3) -> HostResult<Option<ObjectHandle>> {
        self.check_native("createObject")?;
        self.record(EngineCall::CreateObject { model, position })?;

        let mut state = self.state.borrow_mut();
        if state.fail_object_creation {
            return Ok(None);
        }

        let handle = state.next_object;
        state.next_object += 1;
        state.objects.insert(
            handle,
            HeadlessObject {
                model,
                position,
                attached_to: None,
            },
        );
        Ok(Some(ObjectHandle(handle)))
    }

    fn does_entity_exist(&mut self, object: ObjectHandle) -> HostResult<bool> {
        self.record(EngineCall::DoesEntityExist(object))?;
        Ok(self.state.borrow().objects.contains_key(&object.0))
    }

    fn detach_entity(&mut self, object: ObjectHandle) -> HostResult<()> {
        self.check_native("detachEntity")?;
        self.record(EngineCall::DetachEntity(object))?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .objects
            .get_mut(&object.0)
            .ok_or(HostError::UnknownEntity(object.0))?;
        entry.attached_to = None;
        Ok(())
    }

    fn delete_object(&mut self, object: ObjectHandle) -> HostResult<()> {
        self.record(EngineCall::DeleteObject(object))?;
        self.state
            .borrow_mut()
            .objects
            .remove(&object.0)
            .map(|_| ())
            .ok_or(HostError::UnknownEntity(object.0))
    }

    fn ped_bone_index(&mut self, ped: PedHandle, bone_id: i32) -> HostResult<i32> {
        self.check_native("getPedBoneIndex")?;
        self.record(EngineCall::PedBoneIndex { ped, bone_id })?;
        // Headless skeleton: bone index == bone id
        Ok(bone_id)
    }

    fn set_ped_weapon_visible(&mut self, ped: PedHandle, visible: bool) -> HostResult<()> {
        self.record(EngineCall::SetWeaponVisible { ped, visible })?;
        let mut state = self.state.borrow_mut();
        if visible {
            state.hidden_weapons.remove(&ped);
        } else {
            state.hidden_weapons.insert(ped);
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
        self.check_native("attachEntityToEntity")?;
        self.record(EngineCall::AttachEntity {
            object,
            ped,
            bone_index,
            offsets,
        })?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .objects
            .get_mut(&object.0)
            .ok_or(HostError::UnknownEntity(object.0))?;
        entry.attached_to = Some((ped, bone_index, offsets));
        Ok(())
    }

    fn does_anim_dict_exist(&mut self, dictionary: &str) -> HostResult<bool> {
        self.record(EngineCall::DoesAnimDictExist(dictionary.to_string()))?;
        Ok(self.state.borrow().known_anim_dicts.contains(dictionary))
    }

    fn request_anim_dict(&mut self, dictionary: &str) -> HostResult<()> {
        self.record(EngineCall::RequestAnimDict(dictionary.to_string()))?;
        let mut state = self.state.borrow_mut();
        state.requested_dicts.insert(dictionary.to_string());
        if state.instant_loading {
            state.loaded_dicts.insert(dictionary.to_string());
        }
        Ok(())
    }

    fn has_anim_dict_loaded(&mut self, dictionary: &str) -> HostResult<bool> {
        self.record(EngineCall::HasAnimDictLoaded(dictionary.to_string()))?;
        Ok(self.state.borrow().loaded_dicts.contains(dictionary))
    }

    fn task_play_anim(&mut self, ped: PedHandle, task: &AnimationTask) -> HostResult<()> {
        self.check_native("taskPlayAnim")?;
        self.record(EngineCall::PlayAnim {
            ped,
            task: task.clone(),
        })?;
        self.state.borrow_mut().active_animations.insert(ped, task.clone());
        Ok(())
    }

    fn clear_ped_tasks(&mut self, ped: PedHandle) -> HostResult<()> {
        self.record(EngineCall::ClearTasks(ped))?;
        self.state.borrow_mut().active_animations.remove(&ped);
        Ok(())
    }

    fn invalidate_idle_cam(&mut self) -> HostResult<()> {
        self.record(EngineCall::InvalidateIdleCam)?;
        self.state.borrow_mut().idle_cam_invalidations += 1;
        Ok(())
    }

    fn show_cursor(&mut self, visible: bool) -> HostResult<()> {
        self.record(EngineCall::ShowCursor(visible))?;
        self.state.borrow_mut().cursor_visible = visible;
        Ok(())
    }

    fn toggle_game_controls(&mut self, enabled: bool) -> HostResult<()> {
        self.record(EngineCall::ToggleGameControls(enabled))?;
        self.state.borrow_mut().game_controls_enabled = enabled;
        Ok(())
    }
}

impl NetworkApi for HeadlessHost {
    fn local_player(&self) -> Option<PlayerId> {
        self.state.borrow().local_player
    }

    fn players(&self) -> Vec<PlayerSnapshot> {
        self.state.borrow().players.clone()
    }

    fn emit_server(&mut self, event: &str, args: &[serde_json::Value]) -> HostResult<()> {
        self.state
            .borrow_mut()
            .server_events
            .push((event.to_string(), args.to_vec()));
        Ok(())
    }
}

impl DebugViewApi for HeadlessHost {
    fn emit(&mut self, event: &str, payload: serde_json::Value) -> HostResult<()> {
        self.state
            .borrow_mut()
            .view_events
            .push((event.to_string(), payload));
        Ok(())
    }

    fn is_visible(&self) -> bool {
        self.state.borrow().view_visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.borrow_mut().view_visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_delete_object() {
        let mut host = HeadlessHost::new();
        let handle = host
            .create_object(ModelHash(7), Vec3::ZERO)
            .unwrap()
            .expect("object created");

        assert!(host.does_entity_exist(handle).unwrap());
        host.delete_object(handle).unwrap();
        assert!(!host.does_entity_exist(handle).unwrap());
    }

    #[test]
    fn test_failed_creation_returns_null_handle() {
        let mut host = HeadlessHost::new();
        host.state_mut().fail_object_creation = true;

        assert_eq!(host.create_object(ModelHash(7), Vec3::ZERO).unwrap(), None);
        assert_eq!(host.object_count(), 0);
    }

    #[test]
    fn test_failing_native_returns_error() {
        let mut host = HeadlessHost::new();
        host.state_mut().failing_native = Some("createObject");

        assert!(matches!(
            host.create_object(ModelHash(7), Vec3::ZERO),
            Err(HostError::NativeFailed { native: "createObject", .. })
        ));
    }

    #[test]
    fn test_deferred_loading() {
        let mut host = HeadlessHost::new();
        host.set_instant_loading(false);

        host.request_model(ModelHash(3)).unwrap();
        assert!(!host.has_model_loaded(ModelHash(3)).unwrap());

        host.finish_loading_model(ModelHash(3));
        assert!(host.has_model_loaded(ModelHash(3)).unwrap());
    }
}
