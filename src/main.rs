use std::error::Error;

use hello_trace::{server, server::ServerConfig, setup};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup::setup()?;

    let config = ServerConfig::from_env();
    let result = server::run(config).await;

    setup::teardown();
    result
}
