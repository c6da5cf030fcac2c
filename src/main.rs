//! Site Deploy Agent - 静态站点部署代理
//!
//! Usage:
//! - Normal mode: `site-deploy-agent`
//! - With custom port: `site-deploy-agent --port 9090`
//! - With config file: `site-deploy-agent --config /etc/site-deploy/config.json`

use std::path::PathBuf;

use site_deploy_agent::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--config" if i + 1 < args.len() => {
                config.config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Site Deploy Agent - 静态站点部署代理");
    println!();
    println!("USAGE:");
    println!("    site-deploy-agent [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>      Override the listening port");
    println!("    --config <FILE>    JSON config file (default: config.json)");
    println!("    -h, --help         Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    DEPLOY_AUTH_TOKEN  Bearer token required on every request");
    println!("    DEPLOY_PATH        Deployment root directory");
    println!("    PORT, ALLOWED_ORIGINS, LOG_PATH, EXPORT_TYPE, TEMPLATES_DIR");
}

fn main() {
    let config = parse_args();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(site_deploy_agent::init_and_run_agent_with_config(config)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
