#[tokio::main]
async fn main() {
    if let Err(e) = carebook_lib::run().await {
        tracing::error!("Startup failed: {e}");
        eprintln!("carebook: {e}");
        std::process::exit(1);
    }
}
