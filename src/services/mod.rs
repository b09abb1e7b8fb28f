pub mod event_loop;
pub mod keyboard_server;
pub mod layout_registry;
pub mod presenter;
pub mod reconciler;
pub mod window_layouts;

pub use keyboard_server::create_keyboard_server;
pub use presenter::create_presenter;
pub use reconciler::{Dispatch, Reconciler};
pub use window_layouts::WindowLayouts;
