use crate::error::{Result, TrayError};
use crate::events::{ServerEvent, WindowId};
use crate::mappings::parse_symbols;
use crate::trace_if_enabled;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use tokio::io::unix::AsyncFd;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xkb::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ChangeWindowAttributesAux, ConnectionExt as _, EventMask};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::r#trait::{EventSource, KeyboardDescription, KeyboardServer};

/// `PointerRoot` в ответе GetInputFocus
const POINTER_ROOT: xproto::Window = 1;

pub struct X11Server {
    conn: Arc<RustConnection>,
    device: xkb::DeviceSpec,
}

impl X11Server {
    /// Подключиться к X-серверу, включить XKB и подписаться на уведомления
    pub fn connect() -> Result<(Self, X11Events)> {
        info!("Подключение к X-серверу");

        let (conn, screen_num) = RustConnection::connect(None)?;
        let conn = Arc::new(conn);
        let root = conn.setup().roots[screen_num].root;
        let device: xkb::DeviceSpec = xkb::ID::USE_CORE_KBD.into();

        let version = conn.xkb_use_extension(1, 0)?.reply()?;
        if !version.supported {
            return TrayError::service_unavailable(format!(
                "X-сервер поддерживает XKB {}.{}, требуется 1.0",
                version.server_major, version.server_minor
            ));
        }
        debug!(
            "XKB {}.{} доступно",
            version.server_major, version.server_minor
        );

        // Описание клавиатуры: все NewKeyboardNotify; состояние: только смена группы
        let details = xkb::SelectEventsAux::new().state_notify(xkb::SelectEventsAuxStateNotify {
            affect_state: xkb::StatePart::GROUP_STATE,
            state_details: xkb::StatePart::GROUP_STATE,
        });
        conn.xkb_select_events(
            device,
            xkb::EventType::from(0u16),
            xkb::EventType::NEW_KEYBOARD_NOTIFY,
            xkb::MapPart::from(0u16),
            xkb::MapPart::from(0u16),
            &details,
        )?
        .check()?;

        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::SUBSTRUCTURE_NOTIFY | EventMask::FOCUS_CHANGE),
        )?
        .check()?;

        // SAFETY: дескриптор принадлежит соединению, а ConnectionFd держит
        // соединение живым, пока существует AsyncFd
        let fd = unsafe { AsyncFd::register(ConnectionFd(Arc::clone(&conn))) }
            .map_err(io::Error::from)?;
        let events = X11Events { fd };

        info!("Подписка на события корневого окна 0x{:08x} установлена", root);
        Ok((Self { conn, device }, events))
    }

    fn atom_name(&self, atom: xproto::Atom) -> Result<String> {
        let reply = self.conn.get_atom_name(atom)?.reply()?;
        Ok(String::from_utf8_lossy(&reply.name).into_owned())
    }
}

impl KeyboardServer for X11Server {
    fn keyboard_description(&self) -> Result<KeyboardDescription> {
        let controls = self.conn.xkb_get_controls(self.device)?.reply()?;
        let group_count = controls.num_groups;
        if group_count == 0 {
            return Ok(KeyboardDescription::default());
        }

        let state = self.conn.xkb_get_state(self.device)?.reply()?;
        let current_group = u8::from(state.group);
        debug!("Текущая группа #{} из {}", current_group, group_count);

        let names = self
            .conn
            .xkb_get_names(
                self.device,
                xkb::NameDetail::SYMBOLS | xkb::NameDetail::GROUP_NAMES,
            )?
            .reply()?;

        let symbols = match names.value_list.symbols_name {
            Some(atom) if atom != x11rb::NONE => {
                let symbols_name = self.atom_name(atom)?;
                debug!("Символьное имя раскладок: {}", symbols_name);
                parse_symbols(&symbols_name)
            }
            _ => {
                warn!("Сервер не сообщил символьное имя раскладок");
                Vec::new()
            }
        };

        let group_names = names
            .value_list
            .groups
            .unwrap_or_default()
            .into_iter()
            .map(|atom| {
                if atom == x11rb::NONE {
                    None
                } else {
                    self.atom_name(atom).ok()
                }
            })
            .collect();

        Ok(KeyboardDescription {
            group_count,
            current_group,
            symbols,
            group_names,
        })
    }

    fn focused_window(&self) -> Result<Option<WindowId>> {
        let reply = self.conn.get_input_focus()?.reply()?;
        Ok(match reply.focus {
            x11rb::NONE | POINTER_ROOT => None,
            window => Some(WindowId::new(window)),
        })
    }

    fn set_active_group(&self, group: u8) -> Result<()> {
        // Ошибка, если будет, придёт событием и попадёт в журнал
        let no_mods = xproto::ModMask::from(0u16);
        let _cookie = self.conn.xkb_latch_lock_state(
            self.device,
            no_mods,
            no_mods,
            true,
            xkb::Group::from(group),
            no_mods,
            false,
            0,
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn select_window_events(&self, window: WindowId) -> Result<()> {
        // Окно могло уже исчезнуть: BadWindow здесь не интересен
        self.conn
            .change_window_attributes(
                window.value(),
                &ChangeWindowAttributesAux::new()
                    .event_mask(EventMask::FOCUS_CHANGE | EventMask::STRUCTURE_NOTIFY),
            )?
            .ignore_error();
        self.conn.flush()?;
        Ok(())
    }
}

struct ConnectionFd(Arc<RustConnection>);

impl AsRawFd for ConnectionFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0.stream().as_raw_fd()
    }
}

/// Поток событий X11 поверх неблокирующего сокета соединения
pub struct X11Events {
    fd: AsyncFd<ConnectionFd>,
}

impl X11Events {
    fn translate(event: Event) -> Option<ServerEvent> {
        match event {
            Event::CreateNotify(ev) => Some(ServerEvent::WindowCreated(WindowId::new(ev.window))),
            Event::DestroyNotify(ev) => Some(ServerEvent::WindowDestroyed(WindowId::new(ev.window))),
            Event::FocusIn(_) => Some(ServerEvent::FocusIn),
            Event::XkbStateNotify(ev) => {
                let group_changed =
                    u16::from(ev.changed) & u16::from(xkb::StatePart::GROUP_STATE) != 0;
                group_changed.then(|| ServerEvent::KeyboardStateChanged(u8::from(ev.group)))
            }
            Event::XkbNewKeyboardNotify(_) => Some(ServerEvent::KeyboardDescriptionChanged),
            Event::Error(err) => {
                debug!("Ошибка X11 проигнорирована: {:?}", err);
                None
            }
            other => {
                trace_if_enabled!("Пропуск события: {:?}", other);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl EventSource for X11Events {
    async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        loop {
            // Часть событий могла осесть в буфере во время ожидания ответов
            let conn = &self.fd.get_ref().0;
            while let Some(event) = conn.poll_for_event()? {
                if let Some(event) = Self::translate(event) {
                    return Ok(Some(event));
                }
            }

            conn.flush()?;
            let mut guard = self.fd.readable().await?;
            guard.clear_ready();
        }
    }
}
