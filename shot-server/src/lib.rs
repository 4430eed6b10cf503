//! Shot Server - 咖啡萃取记录小票服务
//!
//! # 架构概述
//!
//! 咖啡机插件在每次萃取后上传记录；服务保存原始 JSON，立即响应，
//! 然后在后台渲染小票图片并按需打印。
//!
//! - **接收** (`ingest`): JSON / multipart 上传、编号、持久化
//! - **渲染** (`render`): 曲线图和文字栏排版
//! - **打印** (`printing`): 打印开关、设备位图、打印策略链
//! - **HTTP API** (`api`): 上传、控制和查询接口
//!
//! # 模块结构
//!
//! ```text
//! shot-server/src/
//! ├── core/          # 配置、状态、错误、准入、后台任务
//! ├── ingest/        # 上传解码和编号
//! ├── render/        # 小票渲染
//! ├── printing/      # 打印
//! ├── api/           # HTTP 路由和处理器
//! ├── utils/         # 日志
//! ├── ledger.rs      # 最近记录
//! └── pipeline.rs    # 响应后的渲染/记录/打印
//! ```

pub mod api;
pub mod core;
pub mod ingest;
pub mod ledger;
pub mod pipeline;
pub mod printing;
pub mod render;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerError, ServerState};
pub use ledger::ShotLedger;

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境
///
/// 加载 `.env`，按 LOG_LEVEL / LOG_JSON / LOG_DIR 初始化日志
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        config.log_dir.as_deref(),
    )?;

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   _____ __          __
  / ___// /_  ____  / /_
  \__ \/ __ \/ __ \/ __/
 ___/ / / / / /_/ / /_
/____/_/ /_/\____/\__/
    ____       _       __
   / __ \_____(_)___  / /_
  / /_/ / ___/ / __ \/ __/
 / ____/ /  / / / / / /_
/_/   /_/  /_/_/ /_/\__/
    "#
    );
}
