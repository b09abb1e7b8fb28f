use crate::events::LayoutChange;
use std::io::Write;
use tracing::warn;

use super::r#trait::LayoutPresenter;
use super::FlagIcons;

/// Печатает строку для панели состояния (i3bar, dzen, xmobar) при каждой смене
pub struct StatusLinePresenter<W: Write + Send> {
    out: W,
    prefix: String,
    show_icon: bool,
    icons: FlagIcons,
}

impl<W: Write + Send> StatusLinePresenter<W> {
    pub fn new(out: W, prefix: String, show_icon: bool, icons: FlagIcons) -> Self {
        Self {
            out,
            prefix,
            show_icon,
            icons,
        }
    }

    fn render(&mut self, change: &LayoutChange) -> String {
        if self.show_icon {
            let icon = self.icons.resolve(&change.symbol);
            format!("{}{}\t{}", self.prefix, change.symbol, icon.display())
        } else {
            format!("{}{}", self.prefix, change.symbol)
        }
    }
}

impl<W: Write + Send> LayoutPresenter for StatusLinePresenter<W> {
    fn on_layout_changed(&mut self, change: &LayoutChange) {
        let line = self.render(change);
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Не удалось вывести строку состояния: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_prints_prefixed_symbol() {
        let icons = FlagIcons::new(PathBuf::from("/nonexistent"));
        let mut presenter = StatusLinePresenter::new(Vec::new(), "kb: ".to_string(), false, icons);

        presenter.on_layout_changed(&LayoutChange::new(0, "us"));
        presenter.on_layout_changed(&LayoutChange::new(1, "ru"));

        assert_eq!(String::from_utf8(presenter.out).unwrap(), "kb: us\nkb: ru\n");
    }

    #[test]
    fn test_icon_column() {
        let icons = FlagIcons::new(PathBuf::from("/nonexistent"));
        let mut presenter = StatusLinePresenter::new(Vec::new(), String::new(), true, icons);

        presenter.on_layout_changed(&LayoutChange::new(0, "us"));

        assert_eq!(
            String::from_utf8(presenter.out).unwrap(),
            "us\t/nonexistent/C.png\n"
        );
    }
}
