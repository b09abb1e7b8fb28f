use crate::error::{Result, TrayError};
use tracing::{info, warn};

/// Проверить, что процесс запущен в сеансе X11
pub fn check_display(dry_run: bool) -> Result<()> {
    if dry_run {
        info!("Dry-run: проверка DISPLAY пропущена");
        return Ok(());
    }

    match std::env::var("DISPLAY") {
        Ok(name) if !name.is_empty() => {
            info!("Используется дисплей {}", name);
        }
        _ => {
            return Err(TrayError::ServiceUnavailable(
                "Переменная DISPLAY не задана: требуется сеанс X11".to_string(),
            ));
        }
    }

    // Под Wayland работает только XWayland, и раскладкой управляет композитор
    if std::env::var("XDG_SESSION_TYPE").as_deref() == Ok("wayland") {
        warn!("Сеанс Wayland: отслеживаются только окна XWayland");
    }

    Ok(())
}
