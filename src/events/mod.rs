pub mod layout;
pub mod server;

pub use layout::{LayoutChange, LayoutRequest};
pub use server::{ServerEvent, WindowId};
