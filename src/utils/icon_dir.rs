use crate::error::{Result, TrayError};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Системный каталог флагов, устанавливаемый пакетом
pub const SYSTEM_FLAGS_DIR: &str = "/usr/share/xkbtray/flags";

// Стандартный для GNOME пользовательский каталог ~/.icons/flags
static USER_FLAGS_DIR: Lazy<Option<PathBuf>> = Lazy::new(|| {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".icons").join("flags"))
});

pub struct IconDirFinder;

impl IconDirFinder {
    /// Найти каталог с изображениями флагов
    pub fn find_icon_dir(icon_dir: &str) -> Result<PathBuf> {
        if icon_dir != "auto" {
            let path = PathBuf::from(icon_dir);
            return if path.is_dir() {
                info!("Используется указанный каталог флагов: {:?}", path);
                Ok(path)
            } else {
                Err(TrayError::Internal(format!(
                    "Указанный каталог флагов не найден: {:?}",
                    path
                )))
            };
        }

        Ok(Self::auto_find(USER_FLAGS_DIR.as_deref()))
    }

    fn auto_find(user_dir: Option<&Path>) -> PathBuf {
        if let Some(dir) = user_dir {
            if dir.is_dir() {
                info!("Найден пользовательский каталог флагов: {:?}", dir);
                return dir.to_path_buf();
            }
            debug!("Каталог {:?} не существует", dir);
        }

        let system = PathBuf::from(SYSTEM_FLAGS_DIR);
        if !system.is_dir() {
            warn!(
                "Каталог флагов {:?} не найден, индикатор будет без изображений",
                system
            );
        }
        system
    }
}
