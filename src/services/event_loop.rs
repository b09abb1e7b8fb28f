use crate::error::Result;
use crate::events::LayoutRequest;
use crate::services::keyboard_server::EventSource;
use crate::services::{Dispatch, Reconciler};
use crate::trace_if_enabled;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// Однопоточный цикл: события сервера обрабатываются строго по одному.
///
/// Щелчок по значку приходит запросом из `requests`, SIGUSR1 делает то же
/// самое без трея. Возвращается, когда поток событий закрыт, или с ошибкой,
/// если соединение потеряно либо описание клавиатуры стало неоднозначным.
pub async fn run(
    mut reconciler: Reconciler,
    mut events: Box<dyn EventSource + Send>,
    mut requests: UnboundedReceiver<LayoutRequest>,
) -> Result<()> {
    let mut cycle = signal(SignalKind::user_defined1())?;
    let mut requests_open = true;

    info!("Цикл событий запущен");

    loop {
        tokio::select! {
            event = events.next_event() => {
                let Some(event) = event? else {
                    info!("Поток событий сервера закрыт");
                    return Ok(());
                };

                if reconciler.handle(event)? == Dispatch::Ignored {
                    trace_if_enabled!("Событие {} отброшено", event);
                }
            }
            request = requests.recv(), if requests_open => match request {
                Some(LayoutRequest::CycleGroup) => {
                    debug!("Щелчок по индикатору: следующая раскладка");
                    reconciler.cycle_group();
                }
                None => {
                    debug!("Индикатор не принимает щелчков");
                    requests_open = false;
                }
            },
            _ = cycle.recv() => {
                info!("Получен SIGUSR1: следующая раскладка");
                reconciler.cycle_group();
            }
        }
    }
}
