//! nextray 命令行入口
//!
//! 运行命令：
//! nextray scan example.com -f json -o result.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nextray::{ConfigManager, ScanResult, Scanner};

/// Next.js 站点指纹识别
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描目标站点
    Scan {
        /// 目标URL或域名（未带协议时补全为 https://）
        target: String,

        /// 自定义资源基址（覆盖页面基址）
        #[arg(short, long, value_name = "BASE_URL")]
        base_url: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// 输出文件（缺省输出到标准输出）
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nextray={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn render(result: &ScanResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(result.to_string()),
        OutputFormat::Json => result.to_pretty_json().context("扫描结果序列化失败"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan { target, base_url, format, output } => {
            let mut builder = ConfigManager::custom();
            if let Some(base_url) = base_url {
                builder = builder.custom_base_url(base_url);
            }
            let scanner = Scanner::new(builder.build()).context("扫描器初始化失败")?;

            let result = scanner.scan(&target).await;
            let rendered = render(&result, format)?;

            match output {
                Some(path) => {
                    tokio::fs::write(&path, rendered.as_bytes())
                        .await
                        .with_context(|| format!("写入输出文件失败：{}", path.display()))?;
                    info!("扫描结果已写入 {}", path.display());
                }
                None => {
                    print!("{}", rendered);
                    if !rendered.ends_with('\n') {
                        println!();
                    }
                }
            }

            if let Some(error) = &result.execution_error {
                eprintln!("扫描存在错误：{}", error);
            }
        }
    }

    Ok(())
}
