use crate::debug_if_enabled;
use crate::events::WindowId;
use std::collections::HashMap;
use tracing::warn;

/// Результат регистрации созданного окна
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowInsert {
    Inserted,
    /// Идентификатор уже отслеживается (сервер переиспользовал его)
    AlreadyTracked,
}

/// Последняя выбранная раскладка для каждого окна
#[derive(Debug, Default)]
pub struct WindowLayouts {
    layouts: HashMap<WindowId, u8>,
    reset_on_reuse: bool,
}

impl WindowLayouts {
    pub fn new(reset_on_reuse: bool) -> Self {
        Self {
            layouts: HashMap::new(),
            reset_on_reuse,
        }
    }

    /// Зарегистрировать окно с группой по умолчанию.
    ///
    /// Запись для уже известного идентификатора сохраняется, если не включён
    /// `reset_on_reuse`.
    pub fn on_window_created(&mut self, window: WindowId, default_group: u8) -> WindowInsert {
        match self.layouts.get_mut(&window) {
            Some(group) => {
                if self.reset_on_reuse {
                    warn!(
                        "Окно {} уже отслеживается (группа #{}), сброс на #{}",
                        window, group, default_group
                    );
                    *group = default_group;
                } else {
                    warn!("Окно {} уже отслеживается (группа #{})", window, group);
                }
                WindowInsert::AlreadyTracked
            }
            None => {
                debug_if_enabled!("Окно {} добавлено", window);
                self.layouts.insert(window, default_group);
                WindowInsert::Inserted
            }
        }
    }

    pub fn on_window_destroyed(&mut self, window: WindowId) -> Option<u8> {
        let removed = self.layouts.remove(&window);
        if removed.is_some() {
            debug_if_enabled!("Окно {} удалено из таблицы", window);
        }
        removed
    }

    pub fn get(&self, window: WindowId) -> Option<u8> {
        self.layouts.get(&window).copied()
    }

    /// Записать группу окна; возвращает прежнее значение
    pub fn set(&mut self, window: WindowId, group: u8) -> Option<u8> {
        self.layouts.insert(window, group)
    }

    #[allow(dead_code)]
    pub fn contains(&self, window: WindowId) -> bool {
        self.layouts.contains_key(&window)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// После смены набора раскладок сбросить записи на несуществующие группы
    pub fn reset_invalid(&mut self, group_count: u8, default_group: u8) -> usize {
        let mut reset = 0;
        for group in self.layouts.values_mut() {
            if *group >= group_count {
                *group = default_group;
                reset += 1;
            }
        }
        if reset > 0 {
            warn!(
                "{} окон ссылались на исчезнувшие группы, назначена группа #{}",
                reset, default_group
            );
        }
        reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_create_and_destroy() {
        let mut windows = WindowLayouts::new(false);
        let window = WindowId::new(0x200001);

        assert_eq!(windows.on_window_created(window, 1), WindowInsert::Inserted);
        assert_eq!(windows.get(window), Some(1));

        assert_eq!(windows.on_window_destroyed(window), Some(1));
        assert_eq!(windows.get(window), None);
        assert_eq!(windows.on_window_destroyed(window), None);
    }

    #[test]
    fn test_reused_identity_keeps_entry_by_default() {
        let mut windows = WindowLayouts::new(false);
        let window = WindowId::new(7);

        windows.on_window_created(window, 0);
        windows.set(window, 1);

        assert_eq!(windows.on_window_created(window, 0), WindowInsert::AlreadyTracked);
        assert_eq!(windows.get(window), Some(1));
    }

    #[test]
    fn test_reused_identity_reset_when_configured() {
        let mut windows = WindowLayouts::new(true);
        let window = WindowId::new(7);

        windows.on_window_created(window, 0);
        windows.set(window, 1);

        assert_eq!(windows.on_window_created(window, 0), WindowInsert::AlreadyTracked);
        assert_eq!(windows.get(window), Some(0));
    }

    #[test]
    fn test_identity_reused_after_destroy_gets_fresh_entry() {
        let mut windows = WindowLayouts::new(false);
        let window = WindowId::new(9);

        windows.on_window_created(window, 0);
        windows.set(window, 2);
        windows.on_window_destroyed(window);

        assert_eq!(windows.on_window_created(window, 0), WindowInsert::Inserted);
        assert_eq!(windows.get(window), Some(0));
    }

    #[test]
    fn test_only_live_windows_are_tracked() {
        // Псевдослучайная последовательность создания/уничтожения
        let mut windows = WindowLayouts::new(false);
        let mut live = HashSet::new();
        let mut seed: u32 = 12345;

        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let window = WindowId::new((seed >> 16) % 16 + 1);
            if (seed >> 8) & 1 == 0 {
                windows.on_window_created(window, 0);
                live.insert(window);
            } else {
                windows.on_window_destroyed(window);
                live.remove(&window);
            }

            assert_eq!(windows.len(), live.len());
            assert!(live.iter().all(|w| windows.contains(*w)));
        }
    }

    #[test]
    fn test_reset_invalid_after_remap() {
        let mut windows = WindowLayouts::new(false);
        windows.set(WindowId::new(1), 0);
        windows.set(WindowId::new(2), 3);
        windows.set(WindowId::new(3), 2);

        assert_eq!(windows.reset_invalid(2, 1), 2);
        assert_eq!(windows.get(WindowId::new(1)), Some(0));
        assert_eq!(windows.get(WindowId::new(2)), Some(1));
        assert_eq!(windows.get(WindowId::new(3)), Some(1));
    }
}
