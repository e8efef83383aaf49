#[tokio::main]
async fn main() {
    nivaran::start_server().await;
}
