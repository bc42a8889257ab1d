//! Tests for reconciliation decisions.

#[cfg(test)]
mod tests {
    use crate::reconcile::{decide, is_in_range, ReconcileAction};
    use bevy::prelude::Vec3;

    #[test]
    fn test_no_desired_object_never_attaches() {
        assert_eq!(decide(None, None, true), ReconcileAction::None);
        assert_eq!(decide(None, None, false), ReconcileAction::None);
    }

    #[test]
    fn test_cleared_desired_object_detaches() {
        assert_eq!(decide(None, Some("hat"), true), ReconcileAction::Detach);
        assert_eq!(decide(None, Some("hat"), false), ReconcileAction::Detach);
    }

    #[test]
    fn test_attach_only_in_range() {
        assert_eq!(decide(Some("hat"), None, true), ReconcileAction::Attach);
        assert_eq!(decide(Some("hat"), None, false), ReconcileAction::None);
    }

    #[test]
    fn test_attached_in_range_is_stable() {
        assert_eq!(decide(Some("hat"), Some("hat"), true), ReconcileAction::None);
    }

    #[test]
    fn test_attached_out_of_range_detaches() {
        assert_eq!(decide(Some("hat"), Some("hat"), false), ReconcileAction::Detach);
    }

    #[test]
    fn test_changed_desired_object_reattaches() {
        assert_eq!(decide(Some("cap"), Some("hat"), true), ReconcileAction::Attach);
        assert_eq!(decide(Some("cap"), Some("hat"), false), ReconcileAction::Detach);
    }

    #[test]
    fn test_range_boundary_is_inclusive() {
        let local = Vec3::ZERO;
        assert!(is_in_range(Vec3::new(30.0, 0.0, 0.0), local, 30.0));
        assert!(!is_in_range(Vec3::new(30.01, 0.0, 0.0), local, 30.0));
    }

    #[test]
    fn test_range_is_straight_line_3d() {
        // 3-4-12 → distance 13
        let remote = Vec3::new(3.0, 4.0, 12.0);
        assert!(is_in_range(remote, Vec3::ZERO, 13.0));
        assert!(!is_in_range(remote, Vec3::ZERO, 12.9));
    }

    #[test]
    fn test_stable_inputs_converge_in_one_step() {
        // Симуляция N тиков: attached state меняется только по решению decide
        for desired in [None, Some("hat")] {
            for in_range in [true, false] {
                for initial in [None, Some("hat"), Some("cap")] {
                    let mut attached = initial;
                    let mut actions = 0;

                    for _ in 0..10 {
                        match decide(desired, attached, in_range) {
                            ReconcileAction::None => {}
                            ReconcileAction::Attach => {
                                actions += 1;
                                attached = desired;
                            }
                            ReconcileAction::Detach => {
                                actions += 1;
                                attached = None;
                            }
                        }
                    }

                    assert!(
                        actions <= 1,
                        "desired={:?} in_range={} initial={:?}: {} actions",
                        desired, in_range, initial, actions
                    );
                }
            }
        }
    }
}
