use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 互動式 CLI 使用的精簡格式；`RUST_LOG` 優先於預設過濾條件
pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        env_filter("kpi_etl=debug,info")
    } else {
        env_filter("kpi_etl=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn worker_subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::registry()
        .with(env_filter("kpi_etl=info"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_current_span(false),
        )
}

/// 背景 job worker 輸出 JSON lines，方便集中收集
pub fn init_worker_logger() {
    worker_subscriber().init();
}
