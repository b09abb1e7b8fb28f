//! Reconciler: turns the global XKB notification stream into per-window layouts.
//!
//! The X keyboard extension reports group changes for the whole server, not
//! per window. Every change is therefore attributed to whichever window holds
//! focus at that moment, and every focus change restores the group that was
//! last seen in the newly focused window. The Reconciler is the only mutator
//! of the layout registry and the window map; each handler runs to completion
//! and either mutates state deterministically or ignores the event.

use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{ServerEvent, WindowId};
use crate::services::keyboard_server::KeyboardServer;
use crate::services::layout_registry::LayoutRegistry;
use crate::services::presenter::LayoutPresenter;
use crate::services::window_layouts::{WindowInsert, WindowLayouts};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Итог обработки события
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Событие обработано (возможно, без изменения состояния)
    Consumed,
    /// Событие отброшено: нулевое окно, группа вне диапазона, нет фокуса
    Ignored,
}

pub struct Reconciler {
    server: Arc<dyn KeyboardServer>,
    presenter: Box<dyn LayoutPresenter>,
    registry: LayoutRegistry,
    windows: WindowLayouts,
    active_window: Option<WindowId>,
}

impl Reconciler {
    /// Реестр заполняется до первого события: обработчики опираются на группу по умолчанию
    pub fn new(
        server: Arc<dyn KeyboardServer>,
        presenter: Box<dyn LayoutPresenter>,
        windows: WindowLayouts,
    ) -> Result<Self> {
        let registry = LayoutRegistry::load(server.as_ref())?;
        info!("Раскладки: {}", registry);

        let mut reconciler = Self {
            server,
            presenter,
            registry,
            windows,
            active_window: None,
        };
        reconciler.present();
        Ok(reconciler)
    }

    /// Обработать одно уведомление сервера.
    ///
    /// Ошибкой завершается только пересборка реестра с неоднозначной
    /// нумерацией групп; всё остальное обрабатывается на месте.
    pub fn handle(&mut self, event: ServerEvent) -> Result<Dispatch> {
        debug_if_enabled!("Обработка события: {}", event);

        match event {
            ServerEvent::WindowDestroyed(window) => Ok(self.on_window_destroyed(window)),
            ServerEvent::WindowCreated(window) => Ok(self.on_window_created(window)),
            ServerEvent::FocusIn => Ok(self.on_focus_in()),
            ServerEvent::KeyboardStateChanged(group) => Ok(self.on_keyboard_state_changed(group)),
            ServerEvent::KeyboardDescriptionChanged => self.on_keyboard_description_changed(),
        }
    }

    /// Попросить сервер включить следующую группу. Состояние обновится,
    /// когда придёт ответное уведомление о смене группы.
    pub fn cycle_group(&self) {
        let next = self.registry.next_group();
        if next == self.registry.current_group() {
            debug!("Доступна одна раскладка, переключать нечего");
            return;
        }

        debug!("Запрос следующей группы #{}", next);
        if let Err(e) = self.server.set_active_group(next) {
            warn!("Не удалось переключить раскладку на #{}: {}", next, e);
        }
    }

    #[allow(dead_code)]
    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    #[allow(dead_code)]
    pub fn windows(&self) -> &WindowLayouts {
        &self.windows
    }

    #[allow(dead_code)]
    pub fn active_window(&self) -> Option<WindowId> {
        self.active_window
    }

    fn on_window_destroyed(&mut self, window: WindowId) -> Dispatch {
        self.windows.on_window_destroyed(window);

        // Идентификатор может вернуться новому окну: не считать его уже активным
        if self.active_window == Some(window) {
            self.active_window = None;
        }
        Dispatch::Consumed
    }

    fn on_window_created(&mut self, window: WindowId) -> Dispatch {
        if window.is_none() {
            debug!("CreateNotify без окна");
            return Dispatch::Ignored;
        }

        debug_if_enabled!("Создано окно {}", window);
        if self.windows.on_window_created(window, self.registry.default_group()) == WindowInsert::Inserted {
            self.subscribe(window);
        }
        Dispatch::Consumed
    }

    fn on_focus_in(&mut self) -> Dispatch {
        let focus = match self.query_focus() {
            Some(focus) => focus,
            None => {
                debug!("FocusIn без окна в фокусе");
                return Dispatch::Ignored;
            }
        };

        if self.active_window == Some(focus) {
            return Dispatch::Consumed;
        }
        self.active_window = Some(focus);

        let group = match self.windows.get(focus) {
            Some(group) => group,
            None => {
                // Создание окна прошло мимо нас: заводим запись при первом фокусе
                let group = self.registry.default_group();
                self.windows.set(focus, group);
                self.subscribe(focus);
                group
            }
        };

        if group != self.registry.current_group() {
            if !self.registry.set_current_group(group) {
                return Dispatch::Ignored;
            }
            if let Err(e) = self.server.set_active_group(group) {
                warn!("Не удалось переключить раскладку на #{}: {}", group, e);
            }
            self.present();
        }

        debug!("Фокус на {}, группа #{}", focus, group);
        Dispatch::Consumed
    }

    fn on_keyboard_state_changed(&mut self, group: u8) -> Dispatch {
        if !self.registry.contains(group) {
            debug!(
                "XkbStateNotify с группой #{} при {} группах, пропускаем",
                group,
                self.registry.group_count()
            );
            return Dispatch::Ignored;
        }

        self.active_window = self.query_focus();
        self.registry.set_current_group(group);

        if let Some(window) = self.active_window {
            if self.windows.set(window, group).is_none() {
                self.subscribe(window);
            }
        }

        self.present();
        Dispatch::Consumed
    }

    fn on_keyboard_description_changed(&mut self) -> Result<Dispatch> {
        info!("Описание клавиатуры изменилось, перечитываем раскладки");

        self.registry.rebuild(self.server.as_ref())?;
        self.windows
            .reset_invalid(self.registry.group_count(), self.registry.default_group());

        self.present();
        Ok(Dispatch::Consumed)
    }

    fn query_focus(&self) -> Option<WindowId> {
        match self.server.focused_window() {
            Ok(focus) => focus,
            Err(e) => {
                warn!("Не удалось узнать окно с фокусом: {}", e);
                None
            }
        }
    }

    fn subscribe(&self, window: WindowId) {
        if let Err(e) = self.server.select_window_events(window) {
            warn!("Не удалось подписаться на события окна {}: {}", window, e);
        }
    }

    fn present(&mut self) {
        let change = self.registry.current().to_change();
        self.presenter.on_layout_changed(&change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LayoutChange;
    use crate::mappings::SymbolEntry;
    use crate::services::keyboard_server::{DryRunServer, KeyboardDescription};
    use parking_lot::Mutex;

    const A: WindowId = WindowId(0x0140_0001);
    const B: WindowId = WindowId(0x0160_0001);

    struct RecordingPresenter(Arc<Mutex<Vec<LayoutChange>>>);

    impl LayoutPresenter for RecordingPresenter {
        fn on_layout_changed(&mut self, change: &LayoutChange) {
            self.0.lock().push(change.clone());
        }
    }

    fn description(count: u8, current: u8, symbols: &[(u8, &str)]) -> KeyboardDescription {
        KeyboardDescription {
            group_count: count,
            current_group: current,
            symbols: symbols
                .iter()
                .map(|(group, symbol)| SymbolEntry::new(*group, *symbol))
                .collect(),
            group_names: Vec::new(),
        }
    }

    fn setup(
        desc: KeyboardDescription,
    ) -> (Reconciler, DryRunServer, Arc<Mutex<Vec<LayoutChange>>>) {
        let (server, _events) = DryRunServer::new(desc);
        let shown = Arc::new(Mutex::new(Vec::new()));
        let reconciler = Reconciler::new(
            Arc::new(server.clone()),
            Box::new(RecordingPresenter(Arc::clone(&shown))),
            WindowLayouts::new(false),
        )
        .unwrap();
        (reconciler, server, shown)
    }

    fn us_ru() -> KeyboardDescription {
        description(2, 0, &[(0, "us"), (1, "ru")])
    }

    #[test]
    fn test_initial_layout_is_presented() {
        let (reconciler, _server, shown) = setup(description(2, 1, &[(0, "us"), (1, "ru")]));

        assert_eq!(reconciler.registry().current_group(), 1);
        assert_eq!(shown.lock().last().unwrap().symbol, "ru");
    }

    #[test]
    fn test_two_windows_scenario() {
        let (mut reconciler, server, shown) = setup(us_ru());

        assert_eq!(reconciler.handle(ServerEvent::WindowCreated(A)).unwrap(), Dispatch::Consumed);
        assert_eq!(reconciler.windows().get(A), Some(0));
        assert_eq!(server.subscriptions(), vec![A]);

        server.set_focus(Some(A));
        reconciler.handle(ServerEvent::KeyboardStateChanged(1)).unwrap();
        assert_eq!(reconciler.windows().get(A), Some(1));
        assert_eq!(reconciler.registry().current_group(), 1);
        assert_eq!(shown.lock().last().unwrap().group, 1);

        reconciler.handle(ServerEvent::WindowCreated(B)).unwrap();
        assert_eq!(reconciler.windows().get(B), Some(0));

        server.set_focus(Some(B));
        reconciler.handle(ServerEvent::FocusIn).unwrap();
        assert_eq!(reconciler.registry().current_group(), 0);
        assert_eq!(server.commands(), vec![0]);

        server.set_focus(Some(A));
        reconciler.handle(ServerEvent::FocusIn).unwrap();
        assert_eq!(reconciler.registry().current_group(), 1);
        assert_eq!(server.commands(), vec![0, 1]);
        assert_eq!(shown.lock().last().unwrap().symbol, "ru");

        reconciler.handle(ServerEvent::WindowDestroyed(A)).unwrap();
        assert!(!reconciler.windows().contains(A));
    }

    #[test]
    fn test_repeated_focus_issues_single_command() {
        let (mut reconciler, server, _shown) = setup(us_ru());
        reconciler.handle(ServerEvent::WindowCreated(A)).unwrap();
        server.set_focus(Some(A));
        reconciler.handle(ServerEvent::KeyboardStateChanged(1)).unwrap();
        reconciler.handle(ServerEvent::WindowCreated(B)).unwrap();

        server.set_focus(Some(B));
        reconciler.handle(ServerEvent::FocusIn).unwrap();
        reconciler.handle(ServerEvent::FocusIn).unwrap();

        assert_eq!(server.commands(), vec![0]);
    }

    #[test]
    fn test_untracked_focus_uses_default_group() {
        let (mut reconciler, server, _shown) = setup(description(2, 1, &[(0, "us"), (1, "ru")]));

        server.set_focus(Some(B));
        reconciler.handle(ServerEvent::KeyboardStateChanged(0)).unwrap();
        assert_eq!(reconciler.registry().current_group(), 0);

        // A не создавался на наших глазах
        server.set_focus(Some(A));
        assert_eq!(reconciler.handle(ServerEvent::FocusIn).unwrap(), Dispatch::Consumed);

        assert_eq!(reconciler.registry().current_group(), 1);
        assert_eq!(reconciler.windows().get(A), Some(1));
        assert_eq!(server.commands(), vec![1]);
        assert!(server.subscriptions().contains(&A));
    }

    #[test]
    fn test_out_of_range_state_change_is_ignored() {
        let (mut reconciler, server, shown) = setup(us_ru());
        reconciler.handle(ServerEvent::WindowCreated(A)).unwrap();
        server.set_focus(Some(A));
        let presented = shown.lock().len();

        assert_eq!(
            reconciler.handle(ServerEvent::KeyboardStateChanged(2)).unwrap(),
            Dispatch::Ignored
        );
        assert_eq!(reconciler.registry().current_group(), 0);
        assert_eq!(reconciler.windows().get(A), Some(0));
        assert_eq!(reconciler.active_window(), None);
        assert_eq!(shown.lock().len(), presented);
    }

    #[test]
    fn test_state_change_without_focus_updates_registry_only() {
        let (mut reconciler, _server, shown) = setup(us_ru());

        reconciler.handle(ServerEvent::KeyboardStateChanged(1)).unwrap();

        assert_eq!(reconciler.registry().current_group(), 1);
        assert!(reconciler.windows().is_empty());
        assert_eq!(shown.lock().last().unwrap().group, 1);
    }

    #[test]
    fn test_zero_window_creation_is_ignored() {
        let (mut reconciler, server, _shown) = setup(us_ru());

        assert_eq!(
            reconciler.handle(ServerEvent::WindowCreated(WindowId::NONE)).unwrap(),
            Dispatch::Ignored
        );
        assert!(reconciler.windows().is_empty());
        assert!(server.subscriptions().is_empty());
    }

    #[test]
    fn test_focus_without_window_is_ignored() {
        let (mut reconciler, server, _shown) = setup(us_ru());
        server.set_focus(None);

        assert_eq!(reconciler.handle(ServerEvent::FocusIn).unwrap(), Dispatch::Ignored);
        assert!(server.commands().is_empty());
    }

    #[test]
    fn test_reused_identity_after_destroy_is_refocused() {
        let (mut reconciler, server, _shown) = setup(us_ru());
        reconciler.handle(ServerEvent::WindowCreated(A)).unwrap();
        server.set_focus(Some(A));
        reconciler.handle(ServerEvent::FocusIn).unwrap();
        reconciler.handle(ServerEvent::KeyboardStateChanged(1)).unwrap();

        reconciler.handle(ServerEvent::WindowDestroyed(A)).unwrap();
        assert_eq!(reconciler.active_window(), None);

        // Сервер отдал тот же идентификатор новому окну
        reconciler.handle(ServerEvent::WindowCreated(A)).unwrap();
        reconciler.handle(ServerEvent::FocusIn).unwrap();

        assert_eq!(reconciler.windows().get(A), Some(0));
        assert_eq!(reconciler.registry().current_group(), 0);
        assert_eq!(server.commands(), vec![0]);
    }

    #[test]
    fn test_remap_rebuilds_registry_and_resets_stale_windows() {
        let (mut reconciler, server, shown) = setup(description(
            3,
            0,
            &[(0, "us"), (1, "ru"), (2, "de")],
        ));
        reconciler.handle(ServerEvent::WindowCreated(A)).unwrap();
        server.set_focus(Some(A));
        reconciler.handle(ServerEvent::KeyboardStateChanged(2)).unwrap();

        server.set_description(description(2, 1, &[(0, "us"), (1, "fr")]));
        reconciler.handle(ServerEvent::KeyboardDescriptionChanged).unwrap();

        assert_eq!(reconciler.registry().group_count(), 2);
        assert_eq!(reconciler.registry().current_group(), 1);
        assert_eq!(reconciler.windows().get(A), Some(1));
        assert_eq!(shown.lock().last().unwrap().symbol, "fr");
    }

    #[test]
    fn test_remap_without_groups_falls_back() {
        let (mut reconciler, server, shown) = setup(us_ru());

        server.set_description(description(0, 0, &[]));
        assert_eq!(
            reconciler.handle(ServerEvent::KeyboardDescriptionChanged).unwrap(),
            Dispatch::Consumed
        );

        assert_eq!(reconciler.registry().group_count(), 1);
        assert_eq!(reconciler.registry().current_group(), 0);
        assert_eq!(shown.lock().last().unwrap().symbol, "us");
    }

    #[test]
    fn test_remap_with_gap_is_fatal() {
        let (mut reconciler, server, _shown) = setup(us_ru());

        server.set_description(description(2, 0, &[(0, "us"), (2, "ru")]));
        let err = reconciler
            .handle(ServerEvent::KeyboardDescriptionChanged)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_gap_at_startup_is_fatal() {
        let (server, _events) = DryRunServer::new(description(2, 0, &[(0, "us"), (2, "ru")]));
        let shown = Arc::new(Mutex::new(Vec::new()));

        let result = Reconciler::new(
            Arc::new(server),
            Box::new(RecordingPresenter(Arc::clone(&shown))),
            WindowLayouts::new(false),
        );

        assert!(result.is_err());
        assert!(shown.lock().is_empty());
    }

    #[test]
    fn test_cycle_group_requests_next() {
        let (mut reconciler, server, _shown) = setup(us_ru());

        reconciler.cycle_group();
        assert_eq!(server.commands(), vec![1]);
        // Состояние меняется только по уведомлению сервера
        assert_eq!(reconciler.registry().current_group(), 0);

        reconciler.handle(ServerEvent::KeyboardStateChanged(1)).unwrap();
        reconciler.cycle_group();
        assert_eq!(server.commands(), vec![1, 0]);
    }

    #[test]
    fn test_cycle_group_with_single_layout_is_noop() {
        let (reconciler, server, _shown) = setup(description(0, 0, &[]));

        reconciler.cycle_group();
        assert!(server.commands().is_empty());
    }
}
