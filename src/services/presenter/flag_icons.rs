use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Имя файла флага для неизвестной раскладки
pub const NULL_FLAG: &str = "C.png";

/// Ленивый кэш путей к изображениям флагов по коду раскладки
#[derive(Debug)]
pub struct FlagIcons {
    dir: PathBuf,
    cache: HashMap<String, PathBuf>,
}

impl FlagIcons {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            cache: HashMap::new(),
        }
    }

    /// `<dir>/<sym>.png`, если файл существует, иначе `<dir>/C.png`
    pub fn resolve(&mut self, symbol: &str) -> &Path {
        if !self.cache.contains_key(symbol) {
            let candidate = self.dir.join(format!("{}.png", symbol));
            let path = if candidate.is_file() {
                candidate
            } else {
                debug!("Флаг для '{}' не найден: {}", symbol, candidate.display());
                self.dir.join(NULL_FLAG)
            };
            self.cache.insert(symbol.to_string(), path);
        }
        &self.cache[symbol]
    }
}
