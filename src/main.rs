#[tokio::main]
async fn main() {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
    tradegate::app::logging::init();
    if let Err(err) = tradegate::app::cli::run().await {
        eprintln!("error: {}", err.message);
        std::process::exit(1);
    }
}
