use crate::config::Config;
use crate::error::{Result, TrayError};
use crate::events::{ServerEvent, WindowId};
use crate::mappings::SymbolEntry;
use crate::tray_error;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::{interval, Duration, Interval};
use tracing::info;

use super::r#trait::{EventSource, KeyboardDescription, KeyboardServer};

/// Шаг эмулируемой сессии рабочего стола
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    Create(WindowId),
    Destroy(WindowId),
    Focus(WindowId),
    /// Пользователь переключил раскладку клавишами
    SwitchGroup(u8),
}

#[derive(Debug, Default)]
struct DryRunState {
    description: KeyboardDescription,
    focus: Option<WindowId>,
    queries_fail: bool,
    commands: Vec<u8>,
    subscriptions: Vec<WindowId>,
    // Ответные уведомления сервера на команды
    pending: VecDeque<ServerEvent>,
}

/// Клавиатура и оконный сервер в памяти: для --dry-run и для тестов
#[derive(Clone)]
pub struct DryRunServer {
    state: Arc<Mutex<DryRunState>>,
}

impl DryRunServer {
    pub fn new(description: KeyboardDescription) -> (Self, DryRunEvents) {
        let state = Arc::new(Mutex::new(DryRunState {
            description,
            ..DryRunState::default()
        }));

        let events = DryRunEvents {
            state: Arc::clone(&state),
            script: Vec::new(),
            position: 0,
            repeat: false,
            ticker: None,
        };

        (Self { state }, events)
    }

    /// Эмуляция сессии с раскладками из конфигурации, повторяется бесконечно
    pub fn scripted(config: &Config) -> Result<(Self, DryRunEvents)> {
        if config.dry_run.layouts.is_empty() {
            return Err(tray_error!(internal, "dry_run.layouts пуст"));
        }

        let (server, events) = Self::new(description_for(&config.dry_run.layouts));
        let events = events.with_script(
            demo_script(config.dry_run.layouts.len()),
            Duration::from_millis(config.dry_run.event_interval_ms),
            true,
        );

        info!(
            "Dry-run режим - X-сервер эмулируется, раскладки: {}",
            config.dry_run.layouts.join(",")
        );
        Ok((server, events))
    }

    #[allow(dead_code)]
    pub fn set_focus(&self, window: Option<WindowId>) {
        self.state.lock().focus = window;
    }

    #[allow(dead_code)]
    pub fn set_description(&self, description: KeyboardDescription) {
        self.state.lock().description = description;
    }

    /// Эмулировать недоступность XKB (запросы описания завершаются ошибкой)
    #[allow(dead_code)]
    pub fn set_queries_fail(&self, fail: bool) {
        self.state.lock().queries_fail = fail;
    }

    /// Группы, которые сервер получил командой set_active_group
    #[allow(dead_code)]
    pub fn commands(&self) -> Vec<u8> {
        self.state.lock().commands.clone()
    }

    #[allow(dead_code)]
    pub fn subscriptions(&self) -> Vec<WindowId> {
        self.state.lock().subscriptions.clone()
    }

    #[allow(dead_code)]
    pub fn current_group(&self) -> u8 {
        self.state.lock().description.current_group
    }
}

impl KeyboardServer for DryRunServer {
    fn keyboard_description(&self) -> Result<KeyboardDescription> {
        let state = self.state.lock();
        if state.queries_fail {
            return TrayError::service_unavailable("XKB недоступно (dry-run)");
        }
        Ok(state.description.clone())
    }

    fn focused_window(&self) -> Result<Option<WindowId>> {
        Ok(self.state.lock().focus)
    }

    fn set_active_group(&self, group: u8) -> Result<()> {
        let mut state = self.state.lock();
        state.commands.push(group);

        // Настоящий сервер молча отбрасывает недопустимую группу
        if group < state.description.group_count {
            state.description.current_group = group;
            state.pending.push_back(ServerEvent::KeyboardStateChanged(group));
        }
        Ok(())
    }

    fn select_window_events(&self, window: WindowId) -> Result<()> {
        self.state.lock().subscriptions.push(window);
        Ok(())
    }
}

pub struct DryRunEvents {
    state: Arc<Mutex<DryRunState>>,
    script: Vec<ScriptStep>,
    position: usize,
    repeat: bool,
    ticker: Option<Interval>,
}

impl DryRunEvents {
    pub fn with_script(mut self, script: Vec<ScriptStep>, period: Duration, repeat: bool) -> Self {
        self.script = script;
        self.position = 0;
        self.repeat = repeat;
        self.ticker = Some(interval(period));
        self
    }

    fn apply(&self, step: ScriptStep) -> ServerEvent {
        let mut state = self.state.lock();
        match step {
            ScriptStep::Create(window) => ServerEvent::WindowCreated(window),
            ScriptStep::Destroy(window) => {
                if state.focus == Some(window) {
                    state.focus = None;
                }
                ServerEvent::WindowDestroyed(window)
            }
            ScriptStep::Focus(window) => {
                state.focus = Some(window);
                ServerEvent::FocusIn
            }
            ScriptStep::SwitchGroup(group) => {
                state.description.current_group = group;
                ServerEvent::KeyboardStateChanged(group)
            }
        }
    }
}

#[async_trait::async_trait]
impl EventSource for DryRunEvents {
    async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        let feedback = self.state.lock().pending.pop_front();
        if let Some(event) = feedback {
            return Ok(Some(event));
        }

        if self.position >= self.script.len() {
            if !self.repeat || self.script.is_empty() {
                return Ok(None);
            }
            self.position = 0;
        }

        if let Some(ticker) = self.ticker.as_mut() {
            ticker.tick().await;
        }

        let step = self.script[self.position];
        self.position += 1;

        let event = self.apply(step);
        info!("Dry-run: эмулируем событие {}", event);
        Ok(Some(event))
    }
}

/// Описание клавиатуры с раскладками по порядку групп
pub fn description_for(layouts: &[String]) -> KeyboardDescription {
    KeyboardDescription {
        group_count: layouts.len() as u8,
        current_group: 0,
        symbols: layouts
            .iter()
            .enumerate()
            .map(|(group, symbol)| SymbolEntry::new(group as u8, symbol.as_str()))
            .collect(),
        group_names: vec![None; layouts.len()],
    }
}

/// Два окна, переключение раскладки в одном и переходы фокуса между ними
fn demo_script(group_count: usize) -> Vec<ScriptStep> {
    let editor = WindowId::new(0x0140_0001);
    let terminal = WindowId::new(0x0160_0001);
    let other_group = if group_count > 1 { 1 } else { 0 };

    vec![
        ScriptStep::Create(editor),
        ScriptStep::Focus(editor),
        ScriptStep::SwitchGroup(other_group),
        ScriptStep::Create(terminal),
        ScriptStep::Focus(terminal),
        ScriptStep::Focus(editor),
        ScriptStep::Focus(terminal),
        ScriptStep::Destroy(editor),
        ScriptStep::Destroy(terminal),
    ]
}
