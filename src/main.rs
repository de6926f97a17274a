#[tokio::main]
async fn main() {
    if let Err(e) = ecoscan_lib::run().await {
        log::error!("[STARTUP] {}", e);
        eprintln!("ecoscan: {}", e);
        std::process::exit(1);
    }
}
