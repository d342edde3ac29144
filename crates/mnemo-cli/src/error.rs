use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{err:#}").to_lowercase();

    if msg.contains("api key not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Set your API key with:");
        eprintln!("  {} export OPENAI_API_KEY=<value>", "$".dimmed());
        eprintln!("  or add it under [api_keys] in ~/.config/mnemo/config.toml");
    }

    if msg.contains("config file") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check the path passed to --config and its TOML syntax.");
    }

    if msg.contains("database") && (msg.contains("lock") || msg.contains("already open")) {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Another mnemo process is using the database. Close it and retry.");
    }

    if msg.contains("connection refused") || msg.contains("network") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and try again.");
    }

    std::process::exit(1);
}
