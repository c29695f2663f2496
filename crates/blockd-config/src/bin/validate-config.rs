//! Config validation CLI tool
//!
//! Validates a blockd configuration file and reports any errors.

use blockd_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a blockd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match blockd_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", blockd_config::CURRENT_CONFIG_VERSION);
            println!("  Blocked page: {}", policy.service.blocked_page_url);
            println!(
                "  Default focus session: {}",
                blockd_util::format_duration(policy.blocking.default_focus)
            );
            println!(
                "  Default temporary access: {}",
                blockd_util::format_duration(policy.blocking.default_grant)
            );
            println!(
                "  Challenges: {} problems to unblock, {} to end focus, {} attempts",
                policy.challenges.unblock_problems,
                policy.challenges.focus_deactivation_problems,
                policy.challenges.max_attempts
            );

            if !policy.blocking.blocked_domains.is_empty() {
                println!();
                println!("Blocked domains:");
                for domain in &policy.blocking.blocked_domains {
                    println!("  - {}", domain);
                }
            }

            println!();
            println!("Focus domains:");
            for domain in &policy.blocking.focus_domains {
                println!("  - {}", domain);
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                blockd_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                blockd_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                blockd_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                blockd_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        blockd_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
