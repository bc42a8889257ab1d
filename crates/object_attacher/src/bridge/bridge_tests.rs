//! Tests for event bridge helpers.

#[cfg(test)]
mod tests {
    use crate::bridge::{toggle_cursor, wire, InputCaptureState, ServerEvent};
    use crate::host::{EngineCall, HeadlessHost};
    use serde_json::json;

    #[test]
    fn test_toggle_cursor_flips_cursor_and_controls() {
        let mut host = HeadlessHost::new();
        let mut capture = InputCaptureState::default();

        toggle_cursor(&mut host, &mut capture).unwrap();
        assert!(capture.cursor_active);
        assert!(host.state().cursor_visible);
        assert!(!host.state().game_controls_enabled);

        toggle_cursor(&mut host, &mut capture).unwrap();
        assert!(!capture.cursor_active);
        assert!(!host.state().cursor_visible);
        assert!(host.state().game_controls_enabled);

        assert_eq!(
            host.calls(),
            vec![
                EngineCall::ShowCursor(true),
                EngineCall::ToggleGameControls(false),
                EngineCall::ShowCursor(false),
                EngineCall::ToggleGameControls(true),
            ]
        );
    }

    #[test]
    fn test_server_event_wire_format() {
        let attached = ServerEvent::AttachedObject("beer".into());
        assert_eq!(attached.wire_name(), wire::ATTACHED_OBJECT);
        assert_eq!(attached.args(), vec![json!("beer")]);

        assert_eq!(ServerEvent::DetachedObject.wire_name(), wire::DETACHED_OBJECT);
        assert!(ServerEvent::DetachedObject.args().is_empty());
    }
}
