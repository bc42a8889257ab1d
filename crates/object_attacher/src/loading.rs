//! Resource loads - async загрузка моделей и animation dictionaries
//!
//! Паттерн: request → pending entry → poll каждые `load_poll_interval_ms`
//! (LoadPollUpdate schedule) → loaded → entry удаляется.
//! Для моделей после загрузки вызывается release (model больше не нужна).
//!
//! Attach НЕ ждёт загрузки: entity создаётся сразу, визуал "догоняет"
//! когда модель загрузится. Timeout нет - незагрузившийся ресурс остаётся
//! pending до конца процесса.

use crate::host::{EngineApi, HostBridge, HostResult, ModelHash};
use crate::logger;
use bevy::prelude::*;

/// Ресурс, ожидающий загрузки
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingLoad {
    Model(ModelHash),
    AnimDict(String),
}

/// Resource: pending load requests
#[derive(Resource, Debug, Default)]
pub struct ResourceLoads {
    pending: Vec<PendingLoad>,
}

impl ResourceLoads {
    pub fn pending(&self) -> &[PendingLoad] {
        &self.pending
    }

    pub fn is_pending(&self, load: &PendingLoad) -> bool {
        self.pending.contains(load)
    }

    /// Request модели + регистрация poll'а (повторный request не дублирует entry)
    pub fn request_model(&mut self, engine: &mut dyn EngineApi, model: ModelHash) -> HostResult<()> {
        engine.request_model(model)?;
        self.track(PendingLoad::Model(model));
        Ok(())
    }

    pub fn request_anim_dict(&mut self, engine: &mut dyn EngineApi, dictionary: &str) -> HostResult<()> {
        engine.request_anim_dict(dictionary)?;
        self.track(PendingLoad::AnimDict(dictionary.to_string()));
        Ok(())
    }

    fn track(&mut self, load: PendingLoad) {
        if !self.pending.contains(&load) {
            self.pending.push(load);
        }
    }

    /// Один проход poll'а. Возвращает ресурсы, завершившие загрузку.
    ///
    /// Ошибка host call для одного entry не мешает остальным - entry
    /// остаётся pending и проверяется на следующем poll'е.
    pub fn poll(&mut self, engine: &mut dyn EngineApi) -> Vec<PendingLoad> {
        let mut completed = Vec::new();

        self.pending.retain(|load| match check_loaded(engine, load) {
            Ok(true) => {
                completed.push(load.clone());
                false
            }
            Ok(false) => true,
            Err(err) => {
                logger::log_error(&format!("load poll failed for {:?}: {}", load, err));
                true
            }
        });

        completed
    }
}

fn check_loaded(engine: &mut dyn EngineApi, load: &PendingLoad) -> HostResult<bool> {
    match load {
        PendingLoad::Model(model) => {
            if !engine.has_model_loaded(*model)? {
                return Ok(false);
            }
            engine.set_model_as_no_longer_needed(*model)?;
            Ok(true)
        }
        PendingLoad::AnimDict(dictionary) => engine.has_anim_dict_loaded(dictionary),
    }
}

/// System: poll pending loads (LoadPollUpdate schedule, каждые 100ms)
///
/// NAMING: `_main_thread` суффикс = host API calls (NonSend resources)
pub fn poll_resource_loads_main_thread(
    mut loads: ResMut<ResourceLoads>,
    mut host: NonSendMut<HostBridge>,
) {
    if loads.pending.is_empty() {
        return;
    }

    for load in loads.poll(host.engine.as_mut()) {
        logger::log(&format!("resource loaded: {:?}", load));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EngineCall, HeadlessHost};

    #[test]
    fn test_duplicate_request_tracked_once() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();

        loads.request_model(&mut host, ModelHash(1)).unwrap();
        loads.request_model(&mut host, ModelHash(1)).unwrap();

        assert_eq!(loads.pending().len(), 1);
    }

    #[test]
    fn test_model_released_exactly_once_after_loaded() {
        let mut host = HeadlessHost::new();
        host.set_instant_loading(false);
        let mut loads = ResourceLoads::default();

        loads.request_model(&mut host, ModelHash(9)).unwrap();

        // Ещё не загружено - остаётся pending
        assert!(loads.poll(&mut host).is_empty());
        assert!(loads.is_pending(&PendingLoad::Model(ModelHash(9))));

        host.finish_loading_model(ModelHash(9));
        assert_eq!(loads.poll(&mut host), vec![PendingLoad::Model(ModelHash(9))]);
        assert!(loads.pending().is_empty());

        // Следующий poll - ничего не делает
        assert!(loads.poll(&mut host).is_empty());
        assert_eq!(
            host.count_calls(|call| matches!(call, EngineCall::ReleaseModel(ModelHash(9)))),
            1
        );
    }

    #[test]
    fn test_anim_dict_never_loading_stays_pending() {
        let mut host = HeadlessHost::new();
        host.set_instant_loading(false);
        let mut loads = ResourceLoads::default();

        loads.request_anim_dict(&mut host, "amb@world_human_drinking").unwrap();
        for _ in 0..50 {
            loads.poll(&mut host);
        }

        assert!(loads.is_pending(&PendingLoad::AnimDict("amb@world_human_drinking".into())));
    }
}
