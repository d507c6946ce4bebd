use dotenv::dotenv;
use servicebody_backend::app::app::App;
use servicebody_backend::util::logger::Logger;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG / FILE_LOG_LEVEL from the file apply
    let dotenv_result = dotenv();

    let _guards = match Logger::new() {
        Ok(logger) => logger.guards,
        Err(e) => {
            eprintln!("Failed to initialize file logging: {e}");
            tracing_subscriber::fmt().with_target(true).init();
            Vec::new()
        }
    };

    info!("🚀 Starting service-body backend");

    match dotenv_result {
        Ok(_) => info!("✅ Successfully loaded .env file"),
        Err(e) => warn!("⚠️ Failed to load .env file: {} (using system env vars)", e),
    }

    let app = App::new().await;
    app.start().await;
}
