use crate::config::generate::generate_starter_config;
use crate::config::{system_config_path, user_config_path};
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    // Prefer ~/.config/awslogger, fall back to /etc/awslogger
    let config_path = match user_config_path() {
        Some(user_config) => match user_config.parent().map(fs::create_dir_all) {
            Some(Ok(())) => user_config,
            _ => {
                eprintln!("Warning: Could not create {}", user_config.display());
                eprintln!("Falling back to {}", system_config_path().display());
                system_config_path()
            }
        },
        None => system_config_path(),
    };

    write_new_file(&config_path, &config_content)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

fn write_new_file(path: &PathBuf, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!(
            "config file already exists at {}; remove it first or use --stdout",
            path.display()
        )
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, content)?;
    Ok(())
}
