//! Utility to seed the analyzer API key from the command line
//!
//! Usage: set_api_key <key> [provider]

use std::path::PathBuf;

fn get_database_path() -> PathBuf {
    std::env::var("MACROLOG_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            // Go up from target/release or target/debug to project root
            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(parent) = path.parent() {
                    if let Some(grandparent) = parent.parent() {
                        path = grandparent.to_path_buf();
                    }
                }
            }

            path.push("data");
            std::fs::create_dir_all(&path).ok();
            path.push("macrolog.db");
            path
        })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let key = match args.next() {
        Some(key) if !key.trim().is_empty() => key,
        _ => {
            eprintln!("Usage: set_api_key <key> [provider]");
            eprintln!("  provider: gemini (default), groq, or openai");
            std::process::exit(1);
        }
    };
    let provider = args.next();

    let db_path = get_database_path();
    println!("Database path: {}", db_path.display());

    let database = macrolog::db::Database::new(&db_path)?;
    let conn = database.get_conn()?;
    macrolog::db::migrations::run_migrations(&conn)?;

    let saved = macrolog::tools::settings::set_api_key(&database, &key)?;
    println!("API key saved ({})", saved.key_preview);

    if let Some(name) = provider {
        let selected = macrolog::tools::settings::set_provider(&database, &name)?;
        println!("Provider set to {}", selected.provider.as_str());
    } else {
        println!("Provider: {}", saved.provider.as_str());
    }

    Ok(())
}
