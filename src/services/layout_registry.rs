use crate::error::{Result, TrayError};
use crate::events::LayoutChange;
use crate::services::keyboard_server::{KeyboardDescription, KeyboardServer};
use smallvec::SmallVec;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Аппаратный предел XKB на число групп
pub const MAX_GROUPS: u8 = 4;

/// Раскладка, используемая, когда сервер не сообщил ни одной группы
pub const FALLBACK_SYMBOL: &str = "us";

/// Одна группа раскладки клавиатуры
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutGroup {
    pub index: u8,
    pub symbol: String,
    pub display_name: Option<String>,
}

impl LayoutGroup {
    pub fn new(index: u8, symbol: impl Into<String>) -> Self {
        Self {
            index,
            symbol: symbol.into(),
            display_name: None,
        }
    }

    pub fn to_change(&self) -> LayoutChange {
        LayoutChange::new(self.index, self.symbol.clone())
            .with_display_name(self.display_name.clone())
    }
}

impl fmt::Display for LayoutGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.symbol)
    }
}

/// Набор доступных групп и текущая группа.
///
/// Реестр никогда не правится частично: при смене описания клавиатуры он
/// собирается заново целиком. Индексы групп всегда идут подряд с нуля, а
/// `current_group` всегда указывает на существующую группу.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRegistry {
    groups: SmallVec<[LayoutGroup; MAX_GROUPS as usize]>,
    current_group: u8,
    default_group: u8,
}

impl LayoutRegistry {
    /// Построить реестр по описанию, полученному с сервера.
    ///
    /// Если сервер недоступен или не сообщил групп, используется одна группа
    /// "us". Разрыв в нумерации групп является фатальной ошибкой.
    pub fn load(server: &dyn KeyboardServer) -> Result<Self> {
        match server.keyboard_description() {
            Ok(description) => Self::from_description(&description),
            Err(e) => {
                error!(
                    "Не удалось получить описание клавиатуры: {}, используется '{}'",
                    e, FALLBACK_SYMBOL
                );
                Ok(Self::fallback())
            }
        }
    }

    /// Пересобрать реестр целиком, отбросив прежнее содержимое
    pub fn rebuild(&mut self, server: &dyn KeyboardServer) -> Result<()> {
        *self = Self::load(server)?;
        info!("Реестр раскладок пересобран: {}", self);
        Ok(())
    }

    pub fn from_description(description: &KeyboardDescription) -> Result<Self> {
        let mut group_count = description.group_count;
        if group_count == 0 {
            error!("Сервер не сообщил ни одной группы, используется '{}'", FALLBACK_SYMBOL);
            return Ok(Self::fallback());
        }
        if group_count > MAX_GROUPS {
            warn!(
                "Сервер сообщил {} групп, используются первые {}",
                group_count, MAX_GROUPS
            );
            group_count = MAX_GROUPS;
        }

        let mut slots: [Option<LayoutGroup>; MAX_GROUPS as usize] = Default::default();

        for entry in &description.symbols {
            if entry.group >= group_count {
                warn!(
                    "Раскладка '{}' ссылается на группу #{} при {} группах, пропускаем",
                    entry.symbol, entry.group, group_count
                );
                continue;
            }

            let slot = &mut slots[entry.group as usize];
            if slot.is_some() {
                warn!(
                    "Группа #{} описана повторно, используется '{}'",
                    entry.group, entry.symbol
                );
            }

            let display_name = description
                .group_names
                .get(entry.group as usize)
                .cloned()
                .flatten();

            *slot = Some(LayoutGroup {
                index: entry.group,
                symbol: entry.symbol.clone(),
                display_name,
            });
        }

        let groups: SmallVec<[LayoutGroup; MAX_GROUPS as usize]> =
            slots.into_iter().map_while(|slot| slot).collect();

        if groups.len() != group_count as usize {
            return Err(TrayError::GroupNumbering {
                expected: group_count,
                contiguous: groups.len() as u8,
            });
        }

        let current_group = description.current_group;
        if current_group >= group_count {
            return Err(TrayError::InvalidCurrentGroup {
                current: current_group,
                count: group_count,
            });
        }

        debug!("Текущая группа #{} из {}", current_group, group_count);

        Ok(Self {
            groups,
            current_group,
            default_group: current_group,
        })
    }

    /// Одна синтетическая группа "us"
    pub fn fallback() -> Self {
        let mut groups = SmallVec::new();
        groups.push(LayoutGroup::new(0, FALLBACK_SYMBOL));

        Self {
            groups,
            current_group: 0,
            default_group: 0,
        }
    }

    pub fn group_count(&self) -> u8 {
        self.groups.len() as u8
    }

    pub fn current_group(&self) -> u8 {
        self.current_group
    }

    pub fn default_group(&self) -> u8 {
        self.default_group
    }

    #[allow(dead_code)]
    pub fn groups(&self) -> &[LayoutGroup] {
        &self.groups
    }

    pub fn current(&self) -> &LayoutGroup {
        &self.groups[self.current_group as usize]
    }

    pub fn contains(&self, index: u8) -> bool {
        index < self.group_count()
    }

    /// Сменить текущую группу. Индекс вне диапазона игнорируется (гонка с
    /// перестройкой раскладок), возвращается `false`.
    pub fn set_current_group(&mut self, index: u8) -> bool {
        if !self.contains(index) {
            debug!(
                "Группа #{} вне диапазона 0..{}, обновление проигнорировано",
                index,
                self.group_count()
            );
            return false;
        }
        self.current_group = index;
        true
    }

    /// Следующая группа по кругу (щелчок по индикатору)
    pub fn next_group(&self) -> u8 {
        (self.current_group + 1) % self.group_count()
    }
}

impl fmt::Display for LayoutRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.groups.iter().map(|g| g.to_string()).collect();
        write!(
            f,
            "[{}] текущая #{} по умолчанию #{}",
            groups.join(", "),
            self.current_group,
            self.default_group
        )
    }
}
