use mpp_bridge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    // Run the application
    mpp_bridge::app(options).await
}
