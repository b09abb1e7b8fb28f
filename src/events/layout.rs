use serde::{Deserialize, Serialize};
use std::fmt;

/// Уведомление для индикатора о смене активной раскладки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutChange {
    pub group: u8,
    pub symbol: String,
    pub display_name: Option<String>,
}

impl LayoutChange {
    pub fn new(group: u8, symbol: impl Into<String>) -> Self {
        Self {
            group,
            symbol: symbol.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    /// Текст всплывающей подсказки: имя группы, если сервер его сообщил
    pub fn tooltip(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.symbol)
    }
}

/// Запрос от индикатора к трекеру
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutRequest {
    /// Щелчок по значку: следующая группа по кругу
    CycleGroup,
}

impl fmt::Display for LayoutChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "#{} {} ({})", self.group, self.symbol, name),
            None => write!(f, "#{} {}", self.group, self.symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tooltip_prefers_display_name() {
        let change = LayoutChange::new(1, "ru");
        assert_eq!(change.tooltip(), "ru");

        let change = change.with_display_name(Some("Russian".to_string()));
        assert_eq!(change.tooltip(), "Russian");
        assert_eq!(change.to_string(), "#1 ru (Russian)");
    }
}
