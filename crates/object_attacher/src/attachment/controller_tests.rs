//! Tests for AttachmentController.

#[cfg(test)]
mod tests {
    use crate::attachment::{AttachError, AttachRequest, AttachmentController, PlayerRef};
    use crate::host::{EngineApi, EngineCall, HeadlessHost, HostError, PedHandle, PlayerId};
    use crate::loading::ResourceLoads;
    use crate::registry::{ObjectDescriptor, ObjectRegistry};
    use bevy::prelude::Vec3;

    fn player(id: u32) -> PlayerRef {
        PlayerRef {
            id: PlayerId(id),
            ped: Some(PedHandle(100 + id)),
            position: Vec3::new(1.0, 2.0, 3.0),
        }
    }

    fn registry() -> ObjectRegistry {
        let mut registry = ObjectRegistry::new();
        registry.add(ObjectDescriptor {
            name: "hat".into(),
            model: "prop_hat_01".into(),
            bone_id: 31086,
            position: Vec3::new(0.1, 0.0, 0.0),
            rotation: Vec3::new(0.0, 90.0, 180.0),
        });
        registry.add(ObjectDescriptor {
            name: "cap".into(),
            model: "prop_cap_01".into(),
            bone_id: 31086,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        });
        registry
    }

    #[test]
    fn test_attach_records_handle_and_hides_weapon() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        let p = player(1);

        let handle = controller
            .attach_by_name(&mut host, &mut loads, &registry(), &p, "hat")
            .unwrap();

        assert_eq!(controller.handle(p.id), Some(handle));
        assert_eq!(controller.get(p.id).unwrap().object_name, "hat");

        let object = host.object(handle).unwrap();
        assert_eq!(object.position, p.position);
        let (ped, bone_index, offsets) = object.attached_to.unwrap();
        assert_eq!(ped, PedHandle(101));
        assert_eq!(bone_index, 31086);
        assert_eq!(offsets.rotation, Vec3::new(0.0, 90.0, 180.0));
        assert!(host.state().hidden_weapons.contains(&PedHandle(101)));
    }

    #[test]
    fn test_attach_uses_descriptor_model() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();

        let handle = controller
            .attach_by_name(&mut host, &mut loads, &registry(), &player(1), "hat")
            .unwrap();

        assert_eq!(host.object(handle).unwrap().model, host.model_hash("prop_hat_01"));
    }

    #[test]
    fn test_at_most_one_object_per_player() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        let registry = registry();
        let p = player(1);

        let first = controller.attach_by_name(&mut host, &mut loads, &registry, &p, "hat").unwrap();
        let second = controller.attach_by_name(&mut host, &mut loads, &registry, &p, "cap").unwrap();
        let third = controller.attach_by_name(&mut host, &mut loads, &registry, &p, "hat").unwrap();

        assert_eq!(controller.len(), 1);
        assert_eq!(controller.handle(p.id), Some(third));
        assert!(host.object(first).is_none());
        assert!(host.object(second).is_none());
        assert_eq!(host.object_count(), 1);
    }

    #[test]
    fn test_detach_without_handle_makes_no_engine_calls() {
        let mut host = HeadlessHost::new();
        let mut controller = AttachmentController::default();
        let p = player(1);

        assert_eq!(controller.detach(&mut host, &p), Ok(false));
        assert_eq!(controller.detach(&mut host, &p), Ok(false));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_detach_twice_second_is_noop() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        let p = player(1);

        controller.attach_by_name(&mut host, &mut loads, &registry(), &p, "hat").unwrap();
        assert_eq!(controller.detach(&mut host, &p), Ok(true));

        host.clear_calls();
        assert_eq!(controller.detach(&mut host, &p), Ok(false));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_detach_restores_weapon_and_destroys_entity() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        let p = player(1);

        let handle = controller.attach_by_name(&mut host, &mut loads, &registry(), &p, "hat").unwrap();
        host.clear_calls();

        assert_eq!(controller.detach(&mut host, &p), Ok(true));
        assert_eq!(
            host.calls(),
            vec![
                EngineCall::DoesEntityExist(handle),
                EngineCall::DetachEntity(handle),
                EngineCall::DeleteObject(handle),
                EngineCall::SetWeaponVisible { ped: PedHandle(101), visible: true },
            ]
        );
        assert!(!controller.is_attached(p.id));
    }

    #[test]
    fn test_unregistered_name_makes_no_engine_calls() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();

        let result = controller.attach_by_name(&mut host, &mut loads, &registry(), &player(1), "doesNotExist");

        assert_eq!(result, Err(AttachError::NotRegistered("doesNotExist".into())));
        assert!(host.calls().is_empty());
        assert!(controller.is_empty());
    }

    #[test]
    fn test_null_handle_leaves_state_cleared() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        let registry = registry();
        let p = player(1);

        controller.attach_by_name(&mut host, &mut loads, &registry, &p, "hat").unwrap();
        host.state_mut().fail_object_creation = true;

        let result = controller.attach_by_name(&mut host, &mut loads, &registry, &p, "cap");

        assert!(matches!(result, Err(AttachError::CreationFailed { .. })));
        assert!(!controller.is_attached(p.id));
        assert_eq!(host.object_count(), 0);
    }

    #[test]
    fn test_missing_ped_rejected_before_engine_calls() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        let p = PlayerRef { ped: None, ..player(4) };

        let result = controller.attach_by_name(&mut host, &mut loads, &registry(), &p, "hat");

        assert_eq!(result, Err(AttachError::PedMissing(PlayerId(4))));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_host_failure_surfaces_as_error() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        host.state_mut().failing_native = Some("createObject");

        let result = controller.attach_by_name(&mut host, &mut loads, &registry(), &player(1), "hat");

        assert!(matches!(
            result,
            Err(AttachError::Host(HostError::NativeFailed { native: "createObject", .. }))
        ));
        assert!(controller.is_empty());
    }

    #[test]
    fn test_failed_rigid_attach_does_not_leak_entity() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        host.state_mut().failing_native = Some("attachEntityToEntity");

        let result = controller.attach_by_name(&mut host, &mut loads, &registry(), &player(1), "hat");

        assert!(result.is_err());
        assert_eq!(host.object_count(), 0);
        assert!(!host.state().hidden_weapons.contains(&PedHandle(101)));
    }

    #[test]
    fn test_failed_bone_lookup_deletes_created_entity() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        host.state_mut().failing_native = Some("getPedBoneIndex");

        for _ in 0..3 {
            let result = controller.attach_by_name(&mut host, &mut loads, &registry(), &player(1), "hat");
            assert!(matches!(
                result,
                Err(AttachError::Host(HostError::NativeFailed { native: "getPedBoneIndex", .. }))
            ));
        }

        assert!(controller.is_empty());
        assert_eq!(host.object_count(), 0);
        assert_eq!(host.count_calls(|call| matches!(call, EngineCall::CreateObject { .. })), 3);
        assert_eq!(host.count_calls(|call| matches!(call, EngineCall::DeleteObject(_))), 3);
        assert!(!host.state().hidden_weapons.contains(&PedHandle(101)));
    }

    #[test]
    fn test_stale_handle_is_dropped() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        let p = player(1);

        let handle = controller.attach_by_name(&mut host, &mut loads, &registry(), &p, "hat").unwrap();
        host.destroy_object_externally(handle);

        assert_eq!(controller.detach(&mut host, &p), Ok(false));
        assert!(!controller.is_attached(p.id));
    }

    #[test]
    fn test_explicit_request_bypasses_registry() {
        let mut host = HeadlessHost::new();
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();
        let request = AttachRequest::explicit("prop_tool_01", 57005, Vec3::X, Vec3::Y);

        let handle = controller.attach(&mut host, &mut loads, &player(2), &request).unwrap();

        assert_eq!(host.object(handle).unwrap().model, host.model_hash("prop_tool_01"));
        assert_eq!(controller.get(PlayerId(2)).unwrap().object_name, "prop_tool_01");
    }

    #[test]
    fn test_attach_requests_model_load() {
        let mut host = HeadlessHost::new();
        host.set_instant_loading(false);
        let mut loads = ResourceLoads::default();
        let mut controller = AttachmentController::default();

        controller.attach_by_name(&mut host, &mut loads, &registry(), &player(1), "hat").unwrap();

        // Attach не ждёт загрузки: entity уже есть, load остаётся pending
        assert_eq!(loads.pending().len(), 1);
        assert_eq!(host.object_count(), 1);
    }
}
