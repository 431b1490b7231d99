//! cascade entry point.

mod app;
mod audio;
mod commands;
mod config;
mod logging;
mod waterfall;

#[tokio::main]
async fn main() {
    if let Err(err) = app::run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
