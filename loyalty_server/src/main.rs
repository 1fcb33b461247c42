use dotenvy::dotenv;
use log::info;
use loyalty_server::{
    cli::{handle_command_line_args, MART_ENVS, MART_HELP},
    config::MartConfig,
    server::run_mart_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args(MART_HELP, &MART_ENVS) {
        return;
    }
    let config = MartConfig::from_env_or_default();

    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match run_mart_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
