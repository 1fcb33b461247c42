use dotenvy::dotenv;
use log::info;
use loyalty_server::{
    cli::{handle_command_line_args, ACCRUAL_ENVS, ACCRUAL_HELP},
    config::AccrualServiceConfig,
    server::run_accrual_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args(ACCRUAL_HELP, &ACCRUAL_ENVS) {
        return;
    }
    let config = AccrualServiceConfig::from_env_or_default();

    info!("🚀️ Starting accrual service on {}:{}", config.host, config.port);
    match run_accrual_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
