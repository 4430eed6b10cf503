use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use chrono::{DateTime, Local};
use shot_printer::{PrintDispatcher, PrintImageSpec};

use crate::core::admission::AdmissionControl;
use crate::core::settings::RuntimeSettings;
use crate::core::tasks::ShotTasks;
use crate::core::Config;
use crate::ingest::ShotIdGenerator;
use crate::ledger::ShotLedger;
use crate::printing::ReceiptPrinter;
use crate::render::{GlyphFont, ReceiptRenderer};

/// 服务器状态 - 持有所有组件的共享引用
///
/// 使用 Arc 实现浅拷贝，每个请求处理器和后台任务拿到的是同一份状态。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | settings | Arc<RuntimeSettings> | 打印/豆子信息开关、语言 |
/// | ledger | Arc<ShotLedger> | 最近处理的记录 |
/// | admission | AdmissionControl | 请求并发上限 |
/// | ids | Arc<ShotIdGenerator> | 记录编号 |
/// | renderer | Arc<ReceiptRenderer> | 小票渲染 |
/// | printer | Arc<ReceiptPrinter> | 打印调度 |
/// | tasks | ShotTasks | 后台任务 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub settings: Arc<RuntimeSettings>,
    pub ledger: Arc<ShotLedger>,
    pub admission: AdmissionControl,
    pub ids: Arc<ShotIdGenerator>,
    pub renderer: Arc<ReceiptRenderer>,
    pub printer: Arc<ReceiptPrinter>,
    pub tasks: ShotTasks,
    pub started_at: DateTime<Local>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 创建数据目录、加载字体、按平台组装打印策略
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        let dispatcher = PrintDispatcher::for_platform(config.printer_name.as_deref());
        Self::with_dispatcher(config, dispatcher).await
    }

    /// 使用指定的打印调度器初始化（测试中替换真实打印机）
    pub async fn with_dispatcher(
        config: &Config,
        dispatcher: PrintDispatcher,
    ) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;
        tokio::fs::create_dir_all(&config.image_dir).await?;

        let settings = Arc::new(RuntimeSettings::new(
            config.print_enabled,
            config.bean_info_enabled,
            config.language,
        ));

        let font = GlyphFont::discover(config.font_path.as_deref());
        tracing::info!(font = ?font, "Receipt font selected");

        let spec = PrintImageSpec::default()
            .with_scale(config.print_scale)
            .with_threshold(config.print_threshold);
        tracing::info!(strategies = ?dispatcher.strategy_names(), "Print chain ready");

        let printer = ReceiptPrinter::new(
            dispatcher,
            spec,
            config.printer_name.clone(),
            settings.clone(),
        );

        Ok(Self {
            config: config.clone(),
            ledger: Arc::new(ShotLedger::new(config.ledger_capacity)),
            admission: AdmissionControl::new(config.max_users),
            ids: Arc::new(ShotIdGenerator::new()),
            renderer: Arc::new(ReceiptRenderer::new(font)),
            printer: Arc::new(printer),
            tasks: ShotTasks::new(config.render_concurrency),
            started_at: Local::now(),
            settings,
        })
    }

    /// 记录 JSON 文件路径
    pub fn data_path(&self, filename: &str) -> PathBuf {
        self.config.data_dir.join(filename)
    }

    /// 小票图片路径
    pub fn image_path(&self, filename: &str) -> PathBuf {
        self.config.image_dir.join(filename)
    }
}

impl FromRef<ServerState> for AdmissionControl {
    fn from_ref(state: &ServerState) -> Self {
        state.admission.clone()
    }
}
