mod app;
mod bridge;
mod config;
mod library;
mod logging;
mod mpris;
mod native;
mod runtime;
mod services;
mod state;
mod store;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
