use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrayError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Не удалось подключиться к X-серверу: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[error("Соединение с X-сервером нарушено: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("Ошибка ответа X-сервера: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    /// Нумерация групп XKB не непрерывна: индексы раскладок неоднозначны.
    #[error("Нумерация групп клавиатуры не непрерывна: ожидалось {expected}, подряд определено {contiguous} (проверьте 'xlsatoms | grep pc')")]
    GroupNumbering { expected: u8, contiguous: u8 },

    #[error("Сервер сообщил текущую группу {current} при {count} группах")]
    InvalidCurrentGroup { current: u8, count: u8 },

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl TrayError {
    /// Ошибки, после которых продолжать работу небезопасно.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrayError::GroupNumbering { .. } | TrayError::InvalidCurrentGroup { .. }
        )
    }

    pub fn service_unavailable<T>(msg: impl Into<String>) -> Result<T> {
        Err(TrayError::ServiceUnavailable(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, TrayError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! tray_error {
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::TrayError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::TrayError::Internal(format!($($arg)*))
    };
}
