use env_logger::Env;
use log::error;

mod api;
mod database;
mod docs;
mod env;
mod error;
mod models;
mod request_state;
mod server;
mod token;
mod uploads;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let exit_code = match server::start().await {
        Ok(_) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    };

    std::process::exit(exit_code);
}
