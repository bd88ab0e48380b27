use anyhow::Context;
use clap::Parser;
use kpi_etl::adapters::{InMemoryMetricRepository, InMemoryWidgetRepository, MemoryCache, SqliteWarehouse};
use kpi_etl::config::{Cli, Command};
use kpi_etl::connectors::{connector_for, Connector};
use kpi_etl::extractors::ExtractorRegistry;
use kpi_etl::utils::error::ErrorSeverity;
use kpi_etl::utils::monitor::SystemMonitor;
use kpi_etl::utils::{logger, validation::Validate};
use kpi_etl::{EtlError, EtlPipeline, ExtractConfig, PipelineSettings, PipelineSummary};
use std::path::Path;
use std::sync::Arc;

fn parse_extract_config(raw: &str) -> anyhow::Result<ExtractConfig> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--extract-config is not valid JSON")?;
    Ok(ExtractConfig::from_value(value)?)
}

fn print_summary(summary: &PipelineSummary) -> anyhow::Result<()> {
    println!("✅ ETL process completed successfully!");
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

async fn run_from_file(path: &Path, monitor: bool) -> anyhow::Result<()> {
    tracing::info!("📁 Loading configuration from: {}", path.display());
    let settings = PipelineSettings::from_file(path)
        .with_context(|| format!("failed to load config file '{}'", path.display()))?;
    settings.validate()?;
    tracing::info!("✅ Configuration '{}' validated", settings.pipeline.name);

    let warehouse = SqliteWarehouse::open(settings.warehouse_path())?;
    let metrics = Arc::new(InMemoryMetricRepository::new());
    let pipeline = EtlPipeline::new(
        Arc::new(warehouse),
        Arc::new(MemoryCache::new()),
        Arc::new(InMemoryWidgetRepository::new(settings.widgets.clone())),
        metrics.clone(),
    )
    .with_registry(ExtractorRegistry::new(settings.rest_connector()))
    .with_transformer(settings.transformer()?)
    .with_cache_ttl(settings.cache_ttl())
    .with_monitor(SystemMonitor::new(monitor || settings.monitoring_enabled()));

    let summary = pipeline
        .run(
            &settings.source.r#type,
            settings.extract_config(),
            &settings.source.destination_table,
            settings.source.data_source_id.as_deref(),
        )
        .await?;

    print_summary(&summary)?;
    for metric in metrics.all().await {
        println!(
            "📊 {} {} = {} (widget {})",
            metric.metric_type,
            metric.metric_name,
            metric.metric_value,
            metric.widget_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run { config } => run_from_file(&config, cli.monitor).await,
        Command::Exec {
            source_type,
            destination_table,
            extract_config,
            data_source_id,
            warehouse,
        } => {
            let config = parse_extract_config(&extract_config)?;
            let warehouse = SqliteWarehouse::open(&warehouse)
                .with_context(|| format!("failed to open warehouse '{}'", warehouse))?;
            let pipeline = EtlPipeline::new(
                Arc::new(warehouse),
                Arc::new(MemoryCache::new()),
                Arc::new(InMemoryWidgetRepository::default()),
                Arc::new(InMemoryMetricRepository::new()),
            )
            .with_monitor(SystemMonitor::new(cli.monitor));

            let summary = pipeline
                .run(
                    &source_type,
                    &config,
                    &destination_table,
                    data_source_id.as_deref(),
                )
                .await?;
            print_summary(&summary)
        }
        Command::TestConnection {
            kind,
            extract_config,
        } => {
            let config = parse_extract_config(&extract_config)?;
            let connector = connector_for(&kind).ok_or(EtlError::UnsupportedSourceType {
                source_type: kind.clone(),
            })?;

            if connector.test_connection(&config).await {
                println!("✅ {} connection OK", kind);
                Ok(())
            } else {
                Err(EtlError::config(format!("{} connection test failed", kind)).into())
            }
        }
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<EtlError>().map(EtlError::severity) {
        Some(ErrorSeverity::Low) => 0,
        Some(ErrorSeverity::Medium) => 2,
        Some(ErrorSeverity::High) | None => 1,
        Some(ErrorSeverity::Critical) => 3,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);
    tracing::info!("🚀 Starting kpi-etl");

    if let Err(e) = run_command(cli).await {
        match e.downcast_ref::<EtlError>() {
            Some(etl_error) => {
                tracing::error!(
                    "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                    etl_error,
                    etl_error.category(),
                    etl_error.severity()
                );
                eprintln!("❌ {}", etl_error.user_friendly_message());
                eprintln!("💡 {}", etl_error.recovery_suggestion());
            }
            None => eprintln!("❌ {:#}", e),
        }

        let code = exit_code(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }
}
