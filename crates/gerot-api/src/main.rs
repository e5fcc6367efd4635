use anyhow::Result;

use gerot_api::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let settings = Settings::load()?;
    gerot_api::init_tracing(settings.log_format);

    gerot_api::serve(settings).await
}
