mod flag_icons;
mod log_presenter;
mod status_line;
mod r#trait;
mod tray;

pub use self::flag_icons::FlagIcons;
pub use self::log_presenter::LogPresenter;
pub use self::status_line::StatusLinePresenter;
pub use self::r#trait::{create_presenter, LayoutPresenter};
pub use self::tray::TrayPresenter;
