#[tokio::main]
async fn main() {
    if let Err(e) = pestwatch_lib::run().await {
        eprintln!("pestwatch: {e}");
        std::process::exit(1);
    }
}
