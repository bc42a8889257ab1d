//! Animation helper - play/reset анимации на local player
//!
//! Независим от attachment. Dictionary грузится тем же poll паттерном что и
//! модели (`ResourceLoads`), play task выдаётся сразу, не дожидаясь загрузки.

use crate::host::{AnimationTask, EngineApi, HostError, PedHandle};
use crate::loading::ResourceLoads;
use thiserror::Error;

pub const BLEND_IN_SPEED: f32 = 8.0;
pub const BLEND_OUT_SPEED: f32 = 8.0;
/// -1 = играть пока не очистят tasks
pub const INDEFINITE_DURATION: i32 = -1;
pub const PLAYBACK_RATE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnimationError {
    #[error("animation dictionary does not exist: {0}")]
    DictionaryMissing(String),

    #[error("local player has no ped in the world")]
    PedMissing,

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Task с фиксированными blend/duration (меняются только dictionary/name/flags)
pub fn animation_task(dictionary: &str, name: &str, flags: i32) -> AnimationTask {
    AnimationTask {
        dictionary: dictionary.to_string(),
        name: name.to_string(),
        blend_in: BLEND_IN_SPEED,
        blend_out: BLEND_OUT_SPEED,
        duration_ms: INDEFINITE_DURATION,
        flags,
        playback_rate: PLAYBACK_RATE,
    }
}

/// Play анимации на ped
///
/// Несуществующий dictionary → `DictionaryMissing`, ничего не запрашивается.
pub fn play(
    engine: &mut dyn EngineApi,
    loads: &mut ResourceLoads,
    ped: Option<PedHandle>,
    dictionary: &str,
    name: &str,
    flags: i32,
) -> Result<AnimationTask, AnimationError> {
    let ped = ped.ok_or(AnimationError::PedMissing)?;

    if !engine.does_anim_dict_exist(dictionary)? {
        return Err(AnimationError::DictionaryMissing(dictionary.to_string()));
    }

    loads.request_anim_dict(engine, dictionary)?;

    let task = animation_task(dictionary, name, flags);
    engine.task_play_anim(ped, &task)?;
    Ok(task)
}

/// Очистить все tasks → default locomotion
pub fn reset(engine: &mut dyn EngineApi, ped: Option<PedHandle>) -> Result<(), AnimationError> {
    let ped = ped.ok_or(AnimationError::PedMissing)?;
    engine.clear_ped_tasks(ped)?;
    Ok(())
}
