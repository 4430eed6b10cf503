use shot_server::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 与日志 (LOG_LEVEL / LOG_JSON / LOG_DIR)
    setup_environment()?;
    print_banner();

    let config = Config::from_env();
    tracing::info!(
        work_dir = %config.work_dir.display(),
        port = config.http_port,
        language = %config.language,
        print_enabled = config.print_enabled,
        "☕ Shot server starting..."
    );

    // 创建 shots_data / shots_images，选择小票字体，组装本平台的打印策略链
    let state = ServerState::initialize(&config).await?;

    // 准入中间件和所有路由在 Server::run 中挂载
    if let Err(e) = Server::with_state(config, state).run().await {
        tracing::error!(error = %e, "Shot server stopped with an error");
        return Err(e.into());
    }

    Ok(())
}
