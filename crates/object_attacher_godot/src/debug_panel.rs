//! Debug panel UI - registered objects, attach status, debug buttons
//!
//! Отдельный Godot node (Control), это и есть "debug view" для ECS.
//! Создаётся ObjectAttacherBridge в ready() (только debug_mode), по
//! умолчанию скрыт. Видимость переключает console command.

use godot::classes::{Button, Control, IControl, ItemList, Label};
use godot::prelude::*;
use object_attacher::ObjectRegistry;

/// Debug panel
///
/// # Функции
/// - Status label (local attachment, players, pending loads)
/// - Registered objects list (из `setRegisteredObjects` payload)
/// - Кнопки: refresh registry, detach, reset animation → callbacks на bridge
#[derive(GodotClass)]
#[class(base=Control)]
pub struct DebugPanel {
    base: Base<Control>,

    status_label: Option<Gd<Label>>,
    objects_list: Option<Gd<ItemList>>,
    refresh_button: Option<Gd<Button>>,
    detach_button: Option<Gd<Button>>,
    reset_button: Option<Gd<Button>>,

    /// Path к ObjectAttacherBridge (для callbacks)
    /// ВАЖНО: должен быть установлен ПЕРЕД добавлением в scene tree
    pub(crate) bridge_path: GString,
}

#[godot_api]
impl IControl for DebugPanel {
    fn init(base: Base<Control>) -> Self {
        Self {
            base,
            status_label: None,
            objects_list: None,
            refresh_button: None,
            detach_button: None,
            reset_button: None,
            bridge_path: GString::from(""),
        }
    }

    fn ready(&mut self) {
        self.create_ui();

        if !self.bridge_path.is_empty() {
            self.connect_buttons();
        }

        self.base_mut().set_visible(false);
        object_attacher::log("DebugPanel ready (hidden, toggle via console command)");
    }
}

#[godot_api]
impl DebugPanel {
    fn create_ui(&mut self) {
        let mut status_label = Label::new_alloc();
        status_label.set_text("Object Attacher");
        status_label.set_position(Vector2::new(10.0, 10.0));
        status_label.add_theme_font_size_override("font_size", 16);
        self.base_mut().add_child(&status_label.clone().upcast::<Node>());
        self.status_label = Some(status_label);

        let mut objects_list = ItemList::new_alloc();
        objects_list.set_position(Vector2::new(10.0, 90.0));
        objects_list.set_size(Vector2::new(360.0, 220.0));
        self.base_mut().add_child(&objects_list.clone().upcast::<Node>());
        self.objects_list = Some(objects_list);

        let buttons = [
            ("Refresh objects", 10.0),
            ("Detach object", 130.0),
            ("Reset animation", 250.0),
        ];
        let mut created = Vec::with_capacity(buttons.len());
        for (text, x) in buttons {
            let mut button = Button::new_alloc();
            button.set_text(text);
            button.set_position(Vector2::new(x, 320.0));
            button.set_size(Vector2::new(115.0, 32.0));
            self.base_mut().add_child(&button.clone().upcast::<Node>());
            created.push(button);
        }

        let mut created = created.into_iter();
        self.refresh_button = created.next();
        self.detach_button = created.next();
        self.reset_button = created.next();
    }

    /// Подключить button signals к ObjectAttacherBridge методам
    fn connect_buttons(&mut self) {
        let Some(bridge) = self.base().try_get_node_as::<Node>(self.bridge_path.arg()) else {
            object_attacher::log_error(&format!(
                "DebugPanel: ObjectAttacherBridge not found at path: {}",
                self.bridge_path
            ));
            return;
        };

        let wiring = [
            (self.refresh_button.as_mut(), "debug_request_registered_objects"),
            (self.detach_button.as_mut(), "debug_detach_object"),
            (self.reset_button.as_mut(), "debug_reset_animation"),
        ];
        for (button, method) in wiring {
            if let Some(button) = button {
                button.connect("pressed", &bridge.callable(method));
            }
        }
    }

    /// Заполнить список из payload `setRegisteredObjects`
    pub fn show_registered_objects(&mut self, payload: &serde_json::Value) {
        let Some(list) = self.objects_list.as_mut() else {
            return;
        };

        list.clear();
        let registry = match ObjectRegistry::from_json_str(&payload.to_string()) {
            Ok(registry) => registry,
            Err(err) => {
                object_attacher::log_warning(&format!("DebugPanel: bad registry payload: {}", err));
                return;
            }
        };

        for name in registry.names() {
            if let Some(descriptor) = registry.get(name) {
                list.add_item(
                    format!("{}: {} @ bone {}", name, descriptor.model, descriptor.bone_id).as_str(),
                );
            }
        }
    }

    pub fn set_status(&mut self, text: &str) {
        if let Some(label) = self.status_label.as_mut() {
            label.set_text(text);
        }
    }
}
