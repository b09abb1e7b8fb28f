use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub flags: FlagsConfig,
    pub presenter: PresenterConfig,
    pub windows: WindowsConfig,
    pub dry_run: DryRunConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlagsConfig {
    /// Каталог с изображениями флагов или "auto"
    pub icon_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresenterConfig {
    pub mode: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub show_icon: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowsConfig {
    /// Сбрасывать раскладку окна, если сервер повторно сообщил о создании
    /// уже отслеживаемого идентификатора
    pub reset_on_reuse: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DryRunConfig {
    pub layouts: Vec<String>,
    pub event_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
            },
            flags: FlagsConfig {
                icon_dir: "auto".to_string(),
            },
            presenter: PresenterConfig {
                mode: "log".to_string(),
                prefix: String::new(),
                show_icon: false,
            },
            windows: WindowsConfig {
                reset_on_reuse: false,
            },
            dry_run: DryRunConfig {
                layouts: vec!["us".to_string(), "ru".to_string()],
                event_interval_ms: 2000,
            },
        }
    }
}

impl Config {
    /// Значения по умолчанию, поверх них TOML-файл (если есть) и переменные XKBTRAY_*
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("XKBTRAY_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.flags.icon_dir.is_empty() {
            anyhow::bail!("flags.icon_dir не может быть пустым");
        }

        match self.presenter.mode.as_str() {
            "tray" | "log" | "status_line" => {}
            _ => anyhow::bail!("Неверный режим индикатора: {}", self.presenter.mode),
        }

        // Валидация эмулируемых раскладок
        if self.dry_run.layouts.is_empty() || self.dry_run.layouts.len() > 4 {
            anyhow::bail!(
                "dry_run.layouts должен содержать от 1 до 4 раскладок, задано {}",
                self.dry_run.layouts.len()
            );
        }

        for (i, layout) in self.dry_run.layouts.iter().enumerate() {
            if layout.len() != 2 || !layout.chars().all(|c| c.is_ascii_alphabetic()) {
                anyhow::bail!("Неверный код раскладки '{}' в dry_run.layouts #{}", layout, i + 1);
            }
        }

        if self.dry_run.event_interval_ms < 100 {
            anyhow::bail!("dry_run.event_interval_ms должно быть минимум 100");
        }

        Ok(())
    }
}
