//! Server configuration and CLI argument parsing
//!
//! All settings come from command-line arguments or environment variables
//! with the STOCKROOM_ prefix.
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! stockroom --jwt-secret s3cret --port 9090 --cache-addr 127.0.0.1:6379
//!
//! # Using environment variables
//! export STOCKROOM_JWT_SECRET=s3cret
//! export STOCKROOM_RATE_CAPACITY=20
//! stockroom
//!
//! # Mixed (CLI overrides env)
//! export STOCKROOM_PORT=8080
//! stockroom --port 9090  # Uses port 9090
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the server
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listener configuration
    pub http: HttpConfig,
    /// Durable item store configuration
    pub store: StoreConfig,
    /// Item cache backend, `None` runs without a cache
    pub cache: Option<CacheConfig>,
    /// Global admission bucket
    pub rate_limit: RateLimitConfig,
    /// Login and token settings
    pub auth: AuthConfig,
    /// Insert sample items into an empty store on startup
    pub seed: bool,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Durable item store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`
    pub path: String,
}

/// Redis-protocol cache backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// `host:port` of the cache server
    pub addr: String,
    /// Logical database selected after connecting
    pub db: u32,
    /// Password sent with AUTH after connecting
    pub password: Option<String>,
    /// Connect and per-command timeout (milliseconds)
    pub timeout_ms: u64,
}

impl CacheConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Split `addr` into host and port, `None` if it is not `host:port`
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let (host, port) = self.addr.trim().rsplit_once(':')?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return None;
        }
        Some((host, port.parse().ok()?))
    }
}

/// Global token bucket parameters
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens available at once
    pub capacity: u32,
    /// One token is added per interval (milliseconds)
    pub refill_interval_ms: u64,
}

impl RateLimitConfig {
    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }
}

/// Login and token settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub jwt_secret: String,
    /// Token lifetime (seconds)
    pub token_ttl_secs: u64,
    pub admin_username: String,
    pub admin_password: String,
}

/// Command-line arguments for the server
///
/// All arguments can also be set via environment variables with the
/// STOCKROOM_ prefix. CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "stockroom",
    about = "Inventory service with global rate limiting and a cache-aside item layer",
    long_about = "Inventory HTTP service with a global token-bucket rate limiter and a cache-aside item layer.\n\nA JWT secret is required.\n\nEnvironment variables with STOCKROOM_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    // HTTP
    #[arg(
        long,
        value_name = "HOST",
        help = "HTTP host",
        default_value = "127.0.0.1",
        env = "STOCKROOM_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "HTTP port",
        default_value_t = 8080,
        env = "STOCKROOM_PORT"
    )]
    pub port: u16,

    // Store
    #[arg(
        long,
        value_name = "PATH",
        help = "SQLite database file (use :memory: for a throwaway store)",
        default_value = "stockroom.db",
        env = "STOCKROOM_DATABASE"
    )]
    pub database: String,
    #[arg(
        long,
        help = "Skip seeding an empty store with sample items",
        env = "STOCKROOM_NO_SEED"
    )]
    pub no_seed: bool,

    // Cache
    #[arg(
        long,
        value_name = "ADDR",
        help = "Redis-protocol cache server (host:port); caching is off when unset",
        env = "STOCKROOM_CACHE_ADDR"
    )]
    pub cache_addr: Option<String>,
    #[arg(
        long,
        value_name = "N",
        help = "Cache logical database",
        default_value_t = 0,
        env = "STOCKROOM_CACHE_DB"
    )]
    pub cache_db: u32,
    #[arg(
        long,
        value_name = "PASSWORD",
        help = "Cache password",
        env = "STOCKROOM_CACHE_PASSWORD"
    )]
    pub cache_password: Option<String>,
    #[arg(
        long,
        value_name = "MS",
        help = "Cache connect and command timeout (milliseconds)",
        default_value_t = 250,
        env = "STOCKROOM_CACHE_TIMEOUT_MS"
    )]
    pub cache_timeout_ms: u64,

    // Rate limiting
    #[arg(
        long,
        value_name = "N",
        help = "Global token bucket capacity",
        default_value_t = 5,
        env = "STOCKROOM_RATE_CAPACITY"
    )]
    pub rate_capacity: u32,
    #[arg(
        long,
        value_name = "MS",
        help = "Milliseconds per refilled token",
        default_value_t = 1000,
        env = "STOCKROOM_RATE_REFILL_MS"
    )]
    pub rate_refill_ms: u64,

    // Auth
    #[arg(
        long,
        value_name = "SECRET",
        help = "HMAC secret for signing tokens",
        env = "STOCKROOM_JWT_SECRET",
        hide_env_values = true
    )]
    pub jwt_secret: Option<String>,
    #[arg(
        long,
        value_name = "SECS",
        help = "Token lifetime (seconds)",
        default_value_t = 86_400,
        env = "STOCKROOM_TOKEN_TTL_SECS"
    )]
    pub token_ttl_secs: u64,
    #[arg(
        long,
        value_name = "USER",
        help = "Admin username accepted by /login",
        default_value = "admin",
        env = "STOCKROOM_ADMIN_USERNAME"
    )]
    pub admin_username: String,
    #[arg(
        long,
        value_name = "PASSWORD",
        help = "Admin password accepted by /login",
        default_value = "password",
        env = "STOCKROOM_ADMIN_PASSWORD",
        hide_env_values = true
    )]
    pub admin_password: String,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "STOCKROOM_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the JWT secret is missing or a rate limit
    /// parameter is zero.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        let config = Self::from_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from already parsed arguments
    pub fn from_args(args: Args) -> Self {
        let cache = args.cache_addr.map(|addr| CacheConfig {
            addr,
            db: args.cache_db,
            password: args.cache_password,
            timeout_ms: args.cache_timeout_ms,
        });

        Config {
            http: HttpConfig {
                host: args.host,
                port: args.port,
            },
            store: StoreConfig {
                path: args.database,
            },
            cache,
            rate_limit: RateLimitConfig {
                capacity: args.rate_capacity,
                refill_interval_ms: args.rate_refill_ms,
            },
            auth: AuthConfig {
                jwt_secret: args.jwt_secret.unwrap_or_default(),
                token_ttl_secs: args.token_ttl_secs,
                admin_username: args.admin_username,
                admin_password: args.admin_password,
            },
            seed: !args.no_seed,
            log_level: args.log_level,
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(anyhow!(
                "A JWT secret must be provided.\n\n\
                Set it with:\n  \
                --jwt-secret <SECRET>\n  \
                or STOCKROOM_JWT_SECRET=<SECRET>\n\n\
                For more information, try '--help'"
            ));
        }

        if self.rate_limit.capacity == 0 {
            return Err(anyhow!("Rate limit capacity must be greater than 0"));
        }

        if self.rate_limit.refill_interval_ms == 0 {
            return Err(anyhow!("Rate limit refill interval must be greater than 0"));
        }

        if let Some(cache) = &self.cache {
            if cache.host_port().is_none() {
                return Err(anyhow!(
                    "Cache address must be host:port, got '{}'",
                    cache.addr
                ));
            }
            if cache.timeout_ms == 0 {
                return Err(anyhow!("Cache timeout must be greater than 0"));
            }
        }

        Ok(())
    }

    /// Print all available environment variables and their descriptions
    fn print_env_vars() {
        println!("Stockroom Environment Variables");
        println!("===============================");
        println!();
        println!("All environment variables use the STOCKROOM_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("HTTP:");
        println!("  STOCKROOM_HOST=<host>                 HTTP host [default: 127.0.0.1]");
        println!("  STOCKROOM_PORT=<port>                 HTTP port [default: 8080]");
        println!();

        println!("Store:");
        println!(
            "  STOCKROOM_DATABASE=<path>             SQLite database file [default: stockroom.db]"
        );
        println!("  STOCKROOM_NO_SEED=true|false          Skip sample data [default: false]");
        println!();

        println!("Cache:");
        println!("  STOCKROOM_CACHE_ADDR=<host:port>      Cache server, caching off when unset");
        println!("  STOCKROOM_CACHE_DB=<n>                Logical database [default: 0]");
        println!("  STOCKROOM_CACHE_PASSWORD=<password>   Cache password");
        println!("  STOCKROOM_CACHE_TIMEOUT_MS=<ms>       Connect/command timeout [default: 250]");
        println!();

        println!("Rate Limiting:");
        println!("  STOCKROOM_RATE_CAPACITY=<n>           Global bucket capacity [default: 5]");
        println!("  STOCKROOM_RATE_REFILL_MS=<ms>         Milliseconds per token [default: 1000]");
        println!();

        println!("Authentication:");
        println!("  STOCKROOM_JWT_SECRET=<secret>         Token signing secret (required)");
        println!("  STOCKROOM_TOKEN_TTL_SECS=<secs>       Token lifetime [default: 86400]");
        println!("  STOCKROOM_ADMIN_USERNAME=<user>       Admin username [default: admin]");
        println!("  STOCKROOM_ADMIN_PASSWORD=<password>   Admin password [default: password]");
        println!();

        println!("General Configuration:");
        println!(
            "  STOCKROOM_LOG_LEVEL=<level>           Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  # Ten requests at once, then two per second");
        println!("  export STOCKROOM_RATE_CAPACITY=10");
        println!("  export STOCKROOM_RATE_REFILL_MS=500");
        println!();
        println!("  # Run server (CLI args override env vars)");
        println!("  stockroom --jwt-secret s3cret --port 9090");
    }
}
