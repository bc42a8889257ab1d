//! Attachment controller - prop, жёстко привязанный к кости игрока
//!
//! # Архитектура
//!
//! `AttachmentController` - единственный владелец attachment state
//! (PlayerId → handle). Максимум один объект на игрока: attach всегда
//! начинается с detach.
//!
//! **Attach flow:**
//! 1. detach(player) - старый объект уходит
//! 2. resolve model → request load (async, attach НЕ ждёт)
//! 3. create_object на позиции игрока
//! 4. resolve bone index
//! 5. hide weapon → rigid attach → record handle
//!
//! Ошибка после шага 3 удаляет созданный entity и возвращает weapon.
//!
//! Controller возвращает typed errors и сам их не логирует - решает
//! вызывающий (event bridge / reconciliation tick логируют и продолжают).

pub mod systems;

#[cfg(test)]
mod controller_tests;

pub use systems::*;

use crate::host::{
    AttachOffsets, EngineApi, HostError, ModelHash, ObjectHandle, PedHandle, PlayerId,
};
use crate::loading::ResourceLoads;
use crate::logger;
use crate::registry::ObjectRegistry;
use bevy::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

/// Всё что controller'у нужно знать об игроке
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerRef {
    pub id: PlayerId,
    /// None - персонаж не streamed in (attach невозможен)
    pub ped: Option<PedHandle>,
    pub position: Vec3,
}

/// Параметры attach (registry descriptor или debug override)
#[derive(Debug, Clone, PartialEq)]
pub struct AttachRequest {
    /// Имя объекта (ключ registry либо имя для debug attach)
    pub object_name: String,
    /// Имя модели для движка
    pub model: String,
    pub bone_id: i32,
    pub offsets: AttachOffsets,
}

impl AttachRequest {
    /// Debug attach: модель = имя объекта, registry не используется
    pub fn explicit(object_name: impl Into<String>, bone_id: i32, position: Vec3, rotation: Vec3) -> Self {
        let object_name = object_name.into();
        Self {
            model: object_name.clone(),
            object_name,
            bone_id,
            offsets: AttachOffsets { position, rotation },
        }
    }
}

/// Запись attachment state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedObject {
    pub handle: ObjectHandle,
    pub object_name: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttachError {
    #[error("object is not registered: {0}")]
    NotRegistered(String),

    #[error("player {0:?} has no ped in the world")]
    PedMissing(PlayerId),

    #[error("object is null: {object_name} (model {model})")]
    CreationFailed { object_name: String, model: String },

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Resource: attachment state (PlayerId → attached object)
#[derive(Resource, Debug, Default)]
pub struct AttachmentController {
    attached: HashMap<PlayerId, AttachedObject>,
}

impl AttachmentController {
    pub fn get(&self, player: PlayerId) -> Option<&AttachedObject> {
        self.attached.get(&player)
    }

    pub fn handle(&self, player: PlayerId) -> Option<ObjectHandle> {
        self.attached.get(&player).map(|attached| attached.handle)
    }

    pub fn is_attached(&self, player: PlayerId) -> bool {
        self.attached.contains_key(&player)
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &AttachedObject)> {
        self.attached.iter().map(|(id, attached)| (*id, attached))
    }

    /// Detach + destroy объекта игрока
    ///
    /// Возвращает `true` если entity был удалён. Без handle - no-op (0 engine calls).
    /// Handle, entity которого уже не существует, просто забывается.
    pub fn detach(&mut self, engine: &mut dyn EngineApi, player: &PlayerRef) -> Result<bool, AttachError> {
        let Some(attached) = self.attached.get(&player.id) else {
            return Ok(false);
        };
        let handle = attached.handle;

        if !engine.does_entity_exist(handle)? {
            self.attached.remove(&player.id);
            logger::log(&format!(
                "detach: stale handle {:?} of player {:?} dropped",
                handle, player.id
            ));
            return Ok(false);
        }

        engine.detach_entity(handle)?;
        engine.delete_object(handle)?;
        self.attached.remove(&player.id);

        // Show weapon again
        if let Some(ped) = player.ped {
            engine.set_ped_weapon_visible(ped, true)?;
        }

        Ok(true)
    }

    /// Attach объекта к кости игрока (сначала detach старого)
    pub fn attach(
        &mut self,
        engine: &mut dyn EngineApi,
        loads: &mut ResourceLoads,
        player: &PlayerRef,
        request: &AttachRequest,
    ) -> Result<ObjectHandle, AttachError> {
        let ped = player.ped.ok_or(AttachError::PedMissing(player.id))?;

        // 1. Remove existing object (ошибка не мешает новому attach)
        if let Err(err) = self.detach(engine, player) {
            logger::log_error(&format!(
                "attach: detach of previous object for {:?} failed: {}",
                player.id, err
            ));
            self.attached.remove(&player.id);
        }

        // 2. Model load (async, не ждём)
        let model: ModelHash = engine.model_hash(&request.model);
        loads.request_model(engine, model)?;

        // 3. Spawn на позиции игрока
        let Some(handle) = engine.create_object(model, player.position)? else {
            return Err(AttachError::CreationFailed {
                object_name: request.object_name.clone(),
                model: request.model.clone(),
            });
        };

        // 4-5. Bone index → hide weapon → rigid attach
        if let Err(err) = Self::attach_to_bone(engine, handle, ped, request) {
            // Не оставляем висящий entity без записи в state
            let _ = engine.delete_object(handle);
            let _ = engine.set_ped_weapon_visible(ped, true);
            return Err(err.into());
        }

        self.attached.insert(
            player.id,
            AttachedObject {
                handle,
                object_name: request.object_name.clone(),
            },
        );

        Ok(handle)
    }

    fn attach_to_bone(
        engine: &mut dyn EngineApi,
        handle: ObjectHandle,
        ped: PedHandle,
        request: &AttachRequest,
    ) -> Result<(), HostError> {
        let bone_index = engine.ped_bone_index(ped, request.bone_id)?;
        engine.set_ped_weapon_visible(ped, false)?;
        engine.attach_entity_to_ped(handle, ped, bone_index, request.offsets)
    }

    /// Attach по имени из registry
    ///
    /// Незарегистрированное имя → `NotRegistered`, ни одного engine call.
    pub fn attach_by_name(
        &mut self,
        engine: &mut dyn EngineApi,
        loads: &mut ResourceLoads,
        registry: &ObjectRegistry,
        player: &PlayerRef,
        object_name: &str,
    ) -> Result<ObjectHandle, AttachError> {
        let Some(descriptor) = registry.get(object_name) else {
            return Err(AttachError::NotRegistered(object_name.to_string()));
        };

        let request = AttachRequest {
            object_name: descriptor.name.clone(),
            model: descriptor.model.clone(),
            bone_id: descriptor.bone_id,
            offsets: descriptor.offsets(),
        };

        self.attach(engine, loads, player, &request)
    }

    /// Забыть запись без engine calls (entity уже уничтожен хостом)
    pub fn forget(&mut self, player: PlayerId) -> Option<AttachedObject> {
        self.attached.remove(&player)
    }
}
