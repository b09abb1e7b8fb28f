use tracing::{debug, warn};

/// Раскладка, найденная в символьном имени XKB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// Номер группы, с нуля
    pub group: u8,
    /// Двухбуквенный код раскладки ("us", "ru")
    pub symbol: String,
}

impl SymbolEntry {
    pub fn new(group: u8, symbol: impl Into<String>) -> Self {
        Self {
            group,
            symbol: symbol.into(),
        }
    }
}

/// Разбор символьного имени вида `pc+us+ru:2+inet(evdev)`.
///
/// Суффикс `:N` задаёт номер группы с единицы; без него раскладка относится
/// к первой группе. Из токена берётся ведущая буквенная часть, токены `pc`
/// и всё, что не является двухбуквенным кодом, пропускаются.
pub fn parse_symbols(symbols: &str) -> Vec<SymbolEntry> {
    let mut entries = Vec::new();

    for token in symbols.split('+').filter(|t| !t.is_empty()) {
        debug!("Элемент символьного имени: {}", token);

        let (layout, group) = match token.split_once(':') {
            Some((layout, number)) => (layout, parse_group_number(token, number)),
            None => (token, 0),
        };

        let code_len = layout
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(layout.len());
        let code = &layout[..code_len];

        if code == "pc" || code.len() != 2 {
            continue;
        }

        debug!("Раскладка {} -> группа #{}", code, group);
        entries.push(SymbolEntry::new(group, code));
    }

    entries
}

fn parse_group_number(token: &str, number: &str) -> u8 {
    let digits_len = number
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(number.len());

    match number[..digits_len].parse::<u8>() {
        Ok(n) if n >= 1 => n - 1,
        _ => {
            warn!("Не удалось прочитать номер группы в '{}', используется первая группа", token);
            0
        }
    }
}
