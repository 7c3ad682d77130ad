#[tokio::main]
async fn main() {
    // The subscriber may not be installed yet when configuration fails.
    if let Err(e) = toolhost_lib::run().await {
        eprintln!("toolhost: {e}");
        std::process::exit(1);
    }
}
