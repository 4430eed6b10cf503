use std::path::PathBuf;

use super::settings::Language;

/// 服务配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖（无法解析的值回退到默认值）：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | . | 工作目录 |
/// | DATA_DIR | shots_data | 咖啡记录 JSON 目录（相对 WORK_DIR） |
/// | IMAGE_DIR | shots_images | 小票图片目录（相对 WORK_DIR） |
/// | LOG_DIR | - | 设置后启用按天滚动的日志文件 |
/// | LOG_LEVEL | info | 日志级别（RUST_LOG 优先） |
/// | LOG_JSON | false | JSON 格式日志 |
/// | HTTP_PORT | 8000 | HTTP 服务端口 |
/// | MAX_USERS | 5 | 同时处理的请求数 |
/// | LEDGER_CAPACITY | 50 | 内存中保留的记录数 |
/// | RENDER_CONCURRENCY | 0 | 后台渲染并发上限，0 为不限制 |
/// | PRINT_ENABLED | true | 启动时是否自动打印 |
/// | BEAN_INFO_ENABLED | true | 启动时是否显示咖啡豆信息 |
/// | LANGUAGE | zh | 小票语言 (zh / en) |
/// | PRINTER_NAME | - | 打印机名称，未设置时使用系统默认打印机 |
/// | FONT_PATH | - | 字体文件；`builtin` 强制使用内置方框字体 |
/// | PRINT_SCALE | 4 | 打印位图宽度倍数（576 像素为基准） |
/// | PRINT_THRESHOLD | 200 | 二值化阈值 |
/// | MAX_UPLOAD_BYTES | 16777216 | 请求体大小上限 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/shots HTTP_PORT=8080 LANGUAGE=en cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: PathBuf,
    pub data_dir: PathBuf,
    pub image_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
    /// HTTP 服务端口
    pub http_port: u16,
    /// 准入信号量许可数
    pub max_users: usize,
    pub ledger_capacity: usize,
    /// 0 = 不限制
    pub render_concurrency: usize,
    pub print_enabled: bool,
    pub bean_info_enabled: bool,
    pub language: Language,
    pub printer_name: Option<String>,
    pub font_path: Option<String>,
    pub print_scale: u32,
    pub print_threshold: u8,
    pub max_upload_bytes: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = PathBuf::from(std::env::var("WORK_DIR").unwrap_or_else(|_| ".".into()));
        let data_dir = work_dir.join(env_opt("DATA_DIR").unwrap_or_else(|| "shots_data".into()));
        let image_dir = work_dir.join(env_opt("IMAGE_DIR").unwrap_or_else(|| "shots_images".into()));

        Self {
            data_dir,
            image_dir,
            log_dir: env_opt("LOG_DIR").map(PathBuf::from),
            log_level: env_opt("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: env_or("LOG_JSON", false),
            http_port: env_or("HTTP_PORT", 8000),
            max_users: env_or("MAX_USERS", 5usize).max(1),
            ledger_capacity: env_or("LEDGER_CAPACITY", 50usize).max(1),
            render_concurrency: env_or("RENDER_CONCURRENCY", 0),
            print_enabled: env_or("PRINT_ENABLED", true),
            bean_info_enabled: env_or("BEAN_INFO_ENABLED", true),
            language: env_or("LANGUAGE", Language::Zh),
            printer_name: env_opt("PRINTER_NAME"),
            font_path: env_opt("FONT_PATH"),
            print_scale: env_or("PRINT_SCALE", 4u32).max(1),
            print_threshold: env_or("PRINT_THRESHOLD", 200),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 16 * 1024 * 1024),
            work_dir,
        }
    }

    /// 使用自定义工作目录覆盖配置
    ///
    /// 常用于测试场景，数据和图片目录跟随工作目录
    pub fn with_overrides(work_dir: impl Into<PathBuf>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        let work_dir = work_dir.into();
        config.data_dir = work_dir.join("shots_data");
        config.image_dir = work_dir.join("shots_images");
        config.work_dir = work_dir;
        config.http_port = http_port;
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
