//! Example: Solving an image captcha from a local file.
//!
//! Run with: cargo run --example solve_image -- <client_key> <image_path>

use anticap::{AntiCaptcha, ClientConfig, ImageToTextTask};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output (optional)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(client_key), Some(image_path)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: solve_image <client_key> <image_path>");
    };

    let config = ClientConfig::builder(client_key)
        .verbose(true)
        // Optionally add proxy:
        // .proxy("http://127.0.0.1:8080")
        .build();
    let client = AntiCaptcha::new(config);

    let task = ImageToTextTask::from_file(&image_path)?.field("numeric", 0);

    let mut session = client.session();
    match session.solve(task).await {
        Ok(text) => println!("Success! text: {}", text),
        Err(e) => {
            println!("Failed: {}", e);
            if let Some(task_id) = session.task_id() {
                println!("  task id: {}", task_id);
            }
        }
    }

    Ok(())
}
