use clap::{Parser, Subcommand};

pub const DATABASE_URL_ENV: &str = "LARIAT_DATABASE_URL";
pub const CODEC_KEY_ENV: &str = "LARIAT_CODEC_KEY";

pub const DEFAULT_DATABASE_URL: &str = "sqlite:lariat.db?mode=rwc";
pub const DEFAULT_CODE_LENGTH: u32 = 7;

#[derive(Debug, Parser)]
#[command(name = "lariat")]
pub struct CLI {
    #[arg(long, env = DATABASE_URL_ENV, default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Key for obfuscating values at rest. An empty key stores values
    /// base58-encoded but unmasked.
    #[arg(long, env = CODEC_KEY_ENV, default_value = "")]
    pub codec_key: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a short link for a URL.
    Shorten {
        url: String,

        #[arg(long, default_value_t = DEFAULT_CODE_LENGTH)]
        length: u32,

        /// Seconds until the link expires. Omit for a permanent link.
        #[arg(long)]
        expires_in: Option<i64>,
    },
    /// Resolve a short code to its URL, recording a click.
    Resolve {
        code: String,

        /// Free-form click metadata, such as a user agent string.
        #[arg(long, default_value = "")]
        metadata: String,
    },
    /// Ban a short link so it stops resolving.
    Ban { code: String },
    /// Load every active link into the cache and report the count.
    Warmup,
}
