use crate::config::Config;
use crate::error::{Result, TrayError};
use crate::events::{LayoutChange, LayoutRequest};
use crate::utils::IconDirFinder;
use std::io;
use tokio::sync::mpsc::UnboundedSender;

use super::{FlagIcons, LogPresenter, StatusLinePresenter, TrayPresenter};

/// Отображение текущей раскладки. Ничего не возвращает трекеру и не должен
/// вызывать его повторно.
pub trait LayoutPresenter: Send {
    fn on_layout_changed(&mut self, change: &LayoutChange);
}

/// Factory function to create the presenter selected in the configuration.
///
/// Щелчки по значку в трее уходят в `requests`; остальные индикаторы
/// канал не используют.
pub async fn create_presenter(
    config: &Config,
    requests: UnboundedSender<LayoutRequest>,
) -> Result<Box<dyn LayoutPresenter>> {
    let icons = FlagIcons::new(IconDirFinder::find_icon_dir(&config.flags.icon_dir)?);

    match config.presenter.mode.as_str() {
        "tray" => Ok(Box::new(TrayPresenter::spawn(icons, requests).await?)),
        "log" => Ok(Box::new(LogPresenter::new(icons))),
        "status_line" => Ok(Box::new(StatusLinePresenter::new(
            io::stdout(),
            config.presenter.prefix.clone(),
            config.presenter.show_icon,
            icons,
        ))),
        other => Err(TrayError::Internal(format!(
            "Неизвестный режим индикатора: {}",
            other
        ))),
    }
}
