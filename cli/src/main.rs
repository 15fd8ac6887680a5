mod demo;

use std::env;

use veil_codec::{Handle, RawHandle};
use veil_config::VeilConfig;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];

    match cmd.as_str() {
        "demo" => {
            if args.len() < 3 {
                println!("Usage: demo <age>");
                println!("  age - Plaintext age to run through the eligibility flow");
                return;
            }

            let age: u64 = match args[2].parse() {
                Ok(age) => age,
                Err(_) => {
                    eprintln!("❌ Error: Age must be a valid number");
                    return;
                }
            };

            let config = demo::DemoConfig {
                age,
                poll_interval_ms: VeilConfig::global().network.poll_interval_ms,
            };
            if let Err(e) = demo::run_demo(config).await {
                eprintln!("❌ Error running demo: {}", e);
                std::process::exit(1);
            }
        }
        "accounts" => {
            if let Err(e) = demo::list_dev_accounts() {
                eprintln!("❌ Error listing accounts: {}", e);
                std::process::exit(1);
            }
        }
        "normalize" => {
            if args.len() < 3 {
                println!("Usage: normalize <handle>");
                println!("  handle - Handle as decimal integer or hex string");
                return;
            }
            normalize(&args[2]);
        }
        "config" => {
            print_config();
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Veil CLI - Private Eligibility Development Tool");
    println!();
    println!("USAGE:");
    println!("  veil <command> [args]");
    println!();
    println!("COMMANDS:");
    println!("  demo <age>                 Run the full flow against the in-process dev stack");
    println!("  accounts                   List funded dev accounts");
    println!("  normalize <handle>         Print the canonical form of a handle");
    println!("  config                     Show the effective configuration");
    println!("  help                       Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  veil demo 25                         # Submit age 25 and decrypt the result");
    println!("  veil normalize 42                    # Canonicalize an integer handle");
    println!("  veil normalize 0xDEADBEEF            # Canonicalize a hex handle");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  VEIL_CONFIG          Explicit config file path");
    println!("  VEIL_RPC_URL         Chain RPC endpoint");
    println!("  VEIL_CONTRACT_ADDRESS  Eligibility contract address");
    println!("  VEIL_GRANT_DAYS      Decryption grant validity in days");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}

fn normalize(input: &str) {
    let raw = if let Ok(value) = input.parse::<u128>() {
        RawHandle::Uint(value)
    } else {
        RawHandle::Hex(input.to_string())
    };

    match Handle::normalize(raw) {
        Ok(handle) => println!("{handle}"),
        Err(e) => {
            eprintln!("❌ Invalid handle: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_config() {
    let config = VeilConfig::global();
    println!("[network]");
    println!("rpc_url = \"{}\"", config.network.rpc_url);
    println!("chain_id = {}", config.network.chain_id);
    println!("contract_address = \"{}\"", config.network.contract_address);
    println!("poll_interval_ms = {}", config.network.poll_interval_ms);
    println!();
    println!("[grant]");
    println!("duration_days = {}", config.grant.duration_days);
    println!();
    println!("[features]");
    println!("dev_mode = {}", config.features.dev_mode);
}
