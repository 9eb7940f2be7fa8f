//! AI Dock 会话保存 CLI
//!
//! 从 JSON 文件读取消息列表（`[{"role": "user", "content": "..."}]`），
//! 通过保存协调器写入后端，输出结果 JSON

use aidock_sdk_core_rust::{ApiConfig, ChatMessage, SaveCoordinator, SaveOptions};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// AI Dock 会话保存 CLI
#[derive(Parser, Debug)]
#[command(name = "aidock-cli")]
#[command(about = "AI Dock 会话保存 CLI - 新建会话或追加未保存的消息", long_about = None)]
struct Args {
    /// API 基础地址
    #[arg(long, env = "AIDOCK_API_BASE_URL", default_value = "http://localhost:8000/api")]
    api_base_url: String,

    /// 认证 token
    #[arg(long, env = "AIDOCK_TOKEN", hide_env_values = true)]
    token: String,

    /// 请求超时（秒）
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// 日志级别（默认: info,aidock_sdk_core_rust=debug）
    #[arg(long, default_value = "info,aidock_sdk_core_rust=debug")]
    log_level: String,

    /// 同时写入的日志文件
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// smart save：没有会话 ID 时新建会话，否则追加未保存的消息
    Save {
        /// 消息列表 JSON 文件
        #[arg(short, long)]
        messages: PathBuf,

        /// 已有会话 ID
        #[arg(short, long)]
        conversation_id: Option<i64>,

        /// 后端已保存的消息数量
        #[arg(short, long, default_value = "0")]
        stored_count: usize,

        /// 使用的模型
        #[arg(long)]
        model: Option<String>,

        /// 新建会话的标题
        #[arg(long)]
        title: Option<String>,

        /// 助手配置 ID
        #[arg(long)]
        config_id: Option<i64>,

        /// 项目 ID
        #[arg(long)]
        project_id: Option<i64>,
    },
    /// 把文件中的全部消息按顺序追加到已有会话
    Append {
        #[arg(short, long)]
        messages: PathBuf,

        #[arg(short, long)]
        conversation_id: i64,

        #[arg(long)]
        model: Option<String>,
    },
}

/// 初始化日志（输出到 stdout，可选同时输出到文件）
fn init_logger(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 结果 JSON 走 stdout，日志走 stderr
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法创建日志文件 {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        info!("[CLI] 📝 日志同时输出到文件: {}", path.display());
    }
    Ok(())
}

async fn read_messages(path: &Path) -> Result<Vec<ChatMessage>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取消息文件失败: {}", path.display()))?;
    let messages: Vec<ChatMessage> =
        serde_json::from_str(&text).context("解析消息 JSON 失败")?;
    info!("[CLI] 📄 读取消息 {} 条: {}", messages.len(), path.display());
    Ok(messages)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, args.log_file.as_deref())?;

    let config = ApiConfig {
        api_base_url: args.api_base_url.clone(),
        token: args.token.clone(),
        timeout_secs: args.timeout,
    };
    let coordinator = SaveCoordinator::from_config(&config)?;

    match args.command {
        Command::Save {
            messages,
            conversation_id,
            stored_count,
            model,
            title,
            config_id,
            project_id,
        } => {
            let messages = read_messages(&messages).await?;
            if let Some(id) = conversation_id {
                coordinator.initialize_conversation_state(id, stored_count);
            }
            let options = SaveOptions {
                title,
                config_id,
                model_used: model,
                project_id,
            };
            let result = coordinator
                .smart_save(&messages, conversation_id, stored_count, &options)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Append {
            messages,
            conversation_id,
            model,
        } => {
            let messages = read_messages(&messages).await?;
            coordinator
                .append_messages(conversation_id, &messages, model.as_deref())
                .await?;
            println!(
                "{}",
                serde_json::json!({
                    "conversationId": conversation_id,
                    "appended": messages.len(),
                })
            );
        }
    }

    Ok(())
}
