use crate::error::{Result, TrayError};
use crate::events::{LayoutChange, LayoutRequest};
use ksni::{Status, ToolTip, Tray, TrayMethods};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::r#trait::LayoutPresenter;
use super::FlagIcons;

const APP_TITLE: &str = "xkbtray";
const KEYBOARD_ICON_NAME: &str = "input-keyboard";

/// Значок в области уведомлений (StatusNotifierItem)
pub struct FlagTray {
    icon_dir: String,
    icon_name: String,
    tooltip: String,
    requests: UnboundedSender<LayoutRequest>,
}

impl FlagTray {
    pub fn new(requests: UnboundedSender<LayoutRequest>) -> Self {
        Self {
            icon_dir: String::new(),
            icon_name: KEYBOARD_ICON_NAME.to_string(),
            tooltip: APP_TITLE.to_string(),
            requests,
        }
    }

    /// Показать флаг раскладки: каталог флагов служит темой значков
    fn show(&mut self, icon: &Path, tooltip: &str) {
        self.icon_dir = icon
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.icon_name = icon
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| KEYBOARD_ICON_NAME.to_string());
        self.tooltip = tooltip.to_string();
    }
}

impl Tray for FlagTray {
    fn id(&self) -> String {
        env!("CARGO_PKG_NAME").to_string()
    }

    fn title(&self) -> String {
        APP_TITLE.to_string()
    }

    fn status(&self) -> Status {
        Status::Active
    }

    fn icon_theme_path(&self) -> String {
        self.icon_dir.clone()
    }

    fn icon_name(&self) -> String {
        self.icon_name.clone()
    }

    fn tool_tip(&self) -> ToolTip {
        ToolTip {
            icon_name: self.icon_name.clone(),
            icon_pixmap: Vec::new(),
            title: self.tooltip.clone(),
            description: String::new(),
        }
    }

    // Щелчок: следующая раскладка. Решает трекер, а не значок.
    fn activate(&mut self, _x: i32, _y: i32) {
        if self.requests.send(LayoutRequest::CycleGroup).is_err() {
            debug!("Цикл событий уже завершён, щелчок проигнорирован");
        }
    }
}

/// Индикатор в трее: флаг раскладки и символ во всплывающей подсказке
pub struct TrayPresenter {
    handle: ksni::Handle<FlagTray>,
    icons: FlagIcons,
}

impl TrayPresenter {
    pub async fn spawn(icons: FlagIcons, requests: UnboundedSender<LayoutRequest>) -> Result<Self> {
        let handle = FlagTray::new(requests).spawn().await.map_err(|e| {
            TrayError::ServiceUnavailable(format!("Не удалось создать значок в трее: {}", e))
        })?;

        info!("Значок в трее зарегистрирован");
        Ok(Self { handle, icons })
    }
}

impl LayoutPresenter for TrayPresenter {
    fn on_layout_changed(&mut self, change: &LayoutChange) {
        let icon = self.icons.resolve(&change.symbol).to_path_buf();
        let tooltip = change.tooltip().to_string();
        let handle = self.handle.clone();

        // Обновление идёт через D-Bus асинхронно, трекер его не ждёт
        tokio::spawn(async move {
            let updated = handle
                .update(move |tray: &mut FlagTray| tray.show(&icon, &tooltip))
                .await;
            if updated.is_none() {
                warn!("Служба значка в трее остановлена");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    #[test]
    fn test_flag_icon_and_tooltip() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut tray = FlagTray::new(tx);

        assert_eq!(tray.icon_name(), KEYBOARD_ICON_NAME);

        tray.show(&PathBuf::from("/usr/share/xkbtray/flags/ru.png"), "Russian");

        assert_eq!(tray.icon_theme_path(), "/usr/share/xkbtray/flags");
        assert_eq!(tray.icon_name(), "ru");
        assert_eq!(tray.tool_tip().title, "Russian");
        assert_eq!(tray.tool_tip().icon_name, "ru");
    }

    #[test]
    fn test_unknown_flag_shows_placeholder() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut tray = FlagTray::new(tx);

        tray.show(&PathBuf::from("/home/user/.icons/flags/C.png"), "us");

        assert_eq!(tray.icon_name(), "C");
        assert_eq!(tray.tool_tip().title, "us");
    }

    #[test]
    fn test_click_requests_next_group() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tray = FlagTray::new(tx);

        tray.activate(0, 0);
        tray.activate(10, 10);

        assert_eq!(rx.try_recv().unwrap(), LayoutRequest::CycleGroup);
        assert_eq!(rx.try_recv().unwrap(), LayoutRequest::CycleGroup);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_click_after_shutdown_is_harmless() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tray = FlagTray::new(tx);
        drop(rx);

        tray.activate(0, 0);
    }
}
