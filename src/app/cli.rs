use crate::app::server;
use crate::config::Config;
use crate::{Error, Result};
use std::env;

struct CliArgs {
    config_path: String,
    addr_override: Option<String>,
    show_help: bool,
}

pub async fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    if cli.show_help {
        print_usage();
        return Ok(());
    }

    let mut config = Config::load_or_default(&cli.config_path)?;
    if let Some(addr) = cli.addr_override {
        config.server.bind_addr = addr;
    }
    config.validate()?;

    server::run(config).await
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut config_path = "config.toml".to_string();
    let mut addr_override = None;
    let mut show_help = false;

    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "--help" | "-h" => {
                show_help = true;
                index += 1;
            }
            "--config" | "-c" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| Error::new("missing value for --config"))?;
                config_path = value.to_string();
                index += 2;
            }
            "--addr" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| Error::new("missing value for --addr"))?;
                addr_override = Some(value.to_string());
                index += 2;
            }
            unknown => {
                return Err(Error::new(format!("unknown argument: {unknown}")));
            }
        }
    }

    Ok(CliArgs {
        config_path,
        addr_override,
        show_help,
    })
}

fn print_usage() {
    println!("usage: tradegate [--config <path>] [--addr <host:port>]");
    println!("  -c, --config   Path to config.toml (default: config.toml, optional)");
    println!("      --addr     Bind address (default: 127.0.0.1:8080 or TRADEGATE_BIND_ADDR)");
}
