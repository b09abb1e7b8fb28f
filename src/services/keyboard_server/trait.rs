use crate::config::Config;
use crate::error::Result;
use crate::events::{ServerEvent, WindowId};
use crate::mappings::SymbolEntry;
use std::sync::Arc;

/// Описание клавиатуры, как его сообщает сервер
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardDescription {
    pub group_count: u8,
    pub current_group: u8,
    /// Раскладки по группам, разобранные из символьного имени XKB
    pub symbols: Vec<SymbolEntry>,
    /// Человекочитаемые имена групп (индекс = номер группы)
    pub group_names: Vec<Option<String>>,
}

/// Запросы и команды к X-серверу, которые выполняет трекер раскладок
pub trait KeyboardServer: Send + Sync {
    fn keyboard_description(&self) -> Result<KeyboardDescription>;

    /// Окно с фокусом ввода; `None`, если фокуса нет
    fn focused_window(&self) -> Result<Option<WindowId>>;

    /// Зафиксировать группу XKB. Подтверждение не ожидается.
    fn set_active_group(&self, group: u8) -> Result<()>;

    /// Подписаться на события фокуса и структуры для окна
    fn select_window_events(&self, window: WindowId) -> Result<()>;
}

/// Поток уведомлений X-сервера
#[async_trait::async_trait]
pub trait EventSource {
    /// Следующее событие; `None`, когда поток закрыт
    async fn next_event(&mut self) -> Result<Option<ServerEvent>>;
}

/// Factory function to create the keyboard server halves based on the dry_run flag
pub fn create_keyboard_server(
    config: &Config,
    dry_run: bool,
) -> Result<(Arc<dyn KeyboardServer>, Box<dyn EventSource + Send>)> {
    if dry_run {
        let (server, events) = super::dry_run::DryRunServer::scripted(config)?;
        Ok((Arc::new(server), Box::new(events)))
    } else {
        let (server, events) = super::x11::X11Server::connect()?;
        Ok((Arc::new(server), Box::new(events)))
    }
}
