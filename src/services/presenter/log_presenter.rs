use crate::events::LayoutChange;
use tracing::info;

use super::r#trait::LayoutPresenter;
use super::FlagIcons;

/// Индикатор, пишущий смену раскладки в журнал
pub struct LogPresenter {
    icons: FlagIcons,
}

impl LogPresenter {
    pub fn new(icons: FlagIcons) -> Self {
        Self { icons }
    }
}

impl LayoutPresenter for LogPresenter {
    fn on_layout_changed(&mut self, change: &LayoutChange) {
        let icon = self.icons.resolve(&change.symbol);
        info!(
            "Раскладка: {} [{}], флаг {}",
            change,
            change.tooltip(),
            icon.display()
        );
    }
}
