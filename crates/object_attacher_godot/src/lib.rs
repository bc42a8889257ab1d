use godot::prelude::*;

mod bridge;
mod debug_panel;
mod host;

/// GDExtension entry point
struct ObjectAttacherExtension;

#[gdextension]
unsafe impl ExtensionLibrary for ObjectAttacherExtension {}
