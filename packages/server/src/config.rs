//! Server configuration read from the environment.

use std::str::FromStr;

use cycle_parking_server_models::ParkingLimits;

/// Runtime settings for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Number of database connections held open.
    pub pool_size: usize,
    /// Row caps per query mode.
    pub limits: ParkingLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            pool_size: 4,
            limits: ParkingLimits::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `DB_POOL_SIZE`, `PARKING_BBOX_LIMIT`,
    /// `PARKING_NEAREST_LIMIT` and `PARKING_DEFAULT_LIMIT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// Missing variables use defaults. Unparsable values are logged and
    /// replaced by the default.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_or(&lookup, "PORT", defaults.port),
            pool_size: parse_or(&lookup, "DB_POOL_SIZE", defaults.pool_size).max(1),
            limits: ParkingLimits {
                within: parse_or(&lookup, "PARKING_BBOX_LIMIT", defaults.limits.within),
                nearest: parse_or(&lookup, "PARKING_NEAREST_LIMIT", defaults.limits.nearest),
                any: parse_or(&lookup, "PARKING_DEFAULT_LIMIT", defaults.limits.any),
            },
        }
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    let Some(raw) = lookup(name) else {
        return default;
    };

    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("Ignoring invalid {name}={raw:?}, using default");
        default
    })
}
