//! KeyboardServer: responsibility and boundaries
//!
//! This module and its submodules talk to the windowing server ONLY: they
//! answer queries (keyboard description, input focus), forward the single
//! command (lock an XKB group), subscribe to window notifications and turn
//! raw protocol events into `ServerEvent`s. They MUST NOT keep per-window
//! layout state; that belongs exclusively to the Reconciler.

mod dry_run;
mod r#trait;
mod x11;

pub use self::dry_run::{DryRunServer, ScriptStep};
pub use self::r#trait::{create_keyboard_server, EventSource, KeyboardDescription, KeyboardServer};
