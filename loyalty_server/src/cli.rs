use std::{env, env::VarError};

pub const MART_HELP: &str = include_str!("./cli-help.txt");
pub const ACCRUAL_HELP: &str = include_str!("./accrual-cli-help.txt");

pub const MART_ENVS: [&str; 10] = [
    "RUST_LOG",
    "LOYALTY_HOST",
    "LOYALTY_PORT",
    "LOYALTY_DATABASE_URL",
    "LOYALTY_ACCRUAL_URL",
    "LOYALTY_ACCRUAL_TIMEOUT_MS",
    "LOYALTY_WORKER_PERIOD_MS",
    "LOYALTY_WORKER_COOLDOWN_MS",
    "LOYALTY_WORKER_PACK_LIMIT",
    "LOYALTY_WORKER_POOL_SIZE",
];

pub const ACCRUAL_ENVS: [&str; 8] = [
    "RUST_LOG",
    "ACCRUAL_HOST",
    "ACCRUAL_PORT",
    "ACCRUAL_DATABASE_URL",
    "ACCRUAL_WORKER_PERIOD_MS",
    "ACCRUAL_WORKER_PACK_LIMIT",
    "ACCRUAL_WORKER_POOL_SIZE",
    "ACCRUAL_MAX_REQUESTS_PER_MINUTE",
];

/// There's no real CLI for the servers, so just do quick 'n dirty. Returns true if help was printed.
pub fn handle_command_line_args(readme: &str, envs: &[&str]) -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        println!("\n{readme}\n");
        display_envs(envs);
    }
    has_cli_args
}

fn display_envs(envs: &[&str]) {
    println!("Current environment values:");
    envs.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
