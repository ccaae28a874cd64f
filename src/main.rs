use matrixkit::{console, init_logging, ConfigFile, DEFAULT_CONFIG_FILE, MatrixController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging()?;

    tracing::info!(
        "matrixkit {} (built {})",
        matrixkit::VERSION,
        matrixkit::BUILD_DATE
    );

    // Optional config file path as the only argument
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let mut controller = MatrixController::new(ConfigFile::new(config_path));
    controller.load_config().await;
    console::run(&mut controller).await?;
    controller.shutdown().await;

    Ok(())
}
