use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod mappings;
mod services;
mod utils;

use config::Config;
use services::{create_keyboard_server, create_presenter, Reconciler, WindowLayouts};

#[derive(Parser, Debug)]
#[command(name = "xkbtray")]
#[command(about = "Индикатор раскладки клавиатуры X11 с раскладкой для каждого окна")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "xkbtray.toml")]
    config: String,

    /// Режим сухого запуска (X-сервер эмулируется)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Config::load(&args.config)?;

    // Инициализация системы логирования
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск xkbtray v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - X-сервер эмулируется");
    }

    utils::display::check_display(args.dry_run)?;

    // Реестр раскладок заполняется здесь, до первого события
    let (server, events) = create_keyboard_server(&config, args.dry_run)?;
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let presenter = create_presenter(&config, request_tx).await?;
    let reconciler = Reconciler::new(
        server,
        presenter,
        WindowLayouts::new(config.windows.reset_on_reuse),
    )?;

    info!("Все компоненты инициализированы");

    let outcome = tokio::select! {
        result = services::event_loop::run(reconciler, events, request_rx) => result,
        signal = signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
            }
            Ok(())
        }
    };

    info!("Завершение работы...");

    match outcome {
        Ok(()) => {
            info!("xkbtray завершил работу");
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            error!("Работа невозможна: {}", e);
            Err(e.into())
        }
        Err(e) => {
            error!("Цикл событий прерван: {}", e);
            Err(e.into())
        }
    }
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        "pretty" => registry.with(tracing_subscriber::fmt::layer()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
    }

    Ok(())
}
