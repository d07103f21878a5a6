//! Interactive mode for the server.
//!
//! Prompts the user for bind address, port and database URL before
//! starting the server.

use cycle_parking_database::db;
use dialoguer::{Confirm, Input};

use crate::ServerConfig;

/// Prompts for connection settings starting from `defaults`.
///
/// Sets `DATABASE_URL` for the connection pool and returns the chosen
/// config, or `None` if the user declines to start.
#[must_use]
pub fn prompt(defaults: ServerConfig) -> Option<ServerConfig> {
    println!("Cycle Parking Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| defaults.bind_addr.clone());

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(defaults.port)
        .interact_text()
        .unwrap_or(defaults.port);

    let current_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| db::DEFAULT_DATABASE_URL.to_string());
    let database_url: String = Input::new()
        .with_prompt("Database URL")
        .default(current_url.clone())
        .interact_text()
        .unwrap_or(current_url);

    // SAFETY: We are single-threaded at this point (before server starts) and
    // this variable is only read while opening the connection pool.
    unsafe {
        std::env::set_var("DATABASE_URL", &database_url);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return None;
    }

    Some(ServerConfig {
        bind_addr,
        port,
        ..defaults
    })
}
