#[tokio::main]
async fn main() {
    if let Err(e) = medsafe_lib::run().await {
        eprintln!("medsafe: {e}");
        std::process::exit(1);
    }
}
