use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор окна, выданный X-сервером.
///
/// Сервер переиспользует идентификаторы, поэтому значение годится только
/// для сравнения и как ключ, но не как постоянное имя окна.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl WindowId {
    /// `None` в протоколе X11
    pub const NONE: WindowId = WindowId(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Уведомления X-сервера, на которые реагирует трекер раскладок
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerEvent {
    WindowCreated(WindowId),
    WindowDestroyed(WindowId),
    /// Фокус сменился; какое окно его получило, запрашивается у сервера отдельно
    FocusIn,
    /// Активная группа XKB сменилась (глобально, не для окна)
    KeyboardStateChanged(u8),
    /// Описание клавиатуры перезагружено (setxkbmap и т.п.)
    KeyboardDescriptionChanged,
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::WindowCreated(window) => write!(f, "CreateNotify({})", window),
            ServerEvent::WindowDestroyed(window) => write!(f, "DestroyNotify({})", window),
            ServerEvent::FocusIn => write!(f, "FocusIn"),
            ServerEvent::KeyboardStateChanged(group) => write!(f, "XkbStateNotify(group={})", group),
            ServerEvent::KeyboardDescriptionChanged => write!(f, "XkbNewKeyboardNotify"),
        }
    }
}
