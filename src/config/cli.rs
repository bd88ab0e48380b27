use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "kpi-etl")]
#[command(about = "ETL pipeline feeding KPI dashboard warehouses and widget metrics")]
pub struct Cli {
    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 依 TOML 設定檔執行一次管線
    Run {
        #[arg(long, short)]
        config: PathBuf,
    },
    /// 直接指定來源與抽取設定執行
    Exec {
        source_type: String,
        destination_table: String,
        #[arg(long, help = "Extract config as a JSON object")]
        extract_config: String,
        #[arg(long)]
        data_source_id: Option<String>,
        #[arg(long, default_value = crate::config::toml_config::DEFAULT_WAREHOUSE_PATH)]
        warehouse: String,
    },
    /// 測試 connector（file、database、api、graphql）能否連線
    TestConnection {
        kind: String,
        #[arg(long, help = "Connector config as a JSON object")]
        extract_config: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exec_command() {
        let cli = Cli::parse_from([
            "kpi-etl",
            "exec",
            "csv",
            "sales_kpi",
            "--extract-config",
            r#"{"filepath": "sales.csv"}"#,
            "--data-source-id",
            "ds-1",
            "--verbose",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Command::Exec {
                source_type,
                destination_table,
                data_source_id,
                warehouse,
                ..
            } => {
                assert_eq!(source_type, "csv");
                assert_eq!(destination_table, "sales_kpi");
                assert_eq!(data_source_id.as_deref(), Some("ds-1"));
                assert_eq!(warehouse, "kpi_warehouse.db");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_config() {
        assert!(Cli::try_parse_from(["kpi-etl", "run"]).is_err());
    }
}
