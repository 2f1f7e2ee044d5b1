use anyhow::bail;
use charpool::{AllocatorConfig, Alphabet};
use clap::Parser;
use std::path::PathBuf;

/// Runtime configuration for the `charpool-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first, if present).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "charpool-server",
    version,
    about = "An HTTP service allocating unique character-pool tokens"
)]
pub struct CliArgs {
    /// Tokens available for allocation. Every character is one token; the
    /// string must be non-empty and must not repeat a character.
    ///
    /// Environment variable: `ALLCHARACTERS`
    #[arg(long, env = "ALLCHARACTERS")]
    pub alphabet: String,

    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:3000"))]
    pub server_addr: String,

    /// Path of the redb database file holding participants. When omitted,
    /// participants are kept in memory and lost on restart.
    ///
    /// Environment variable: `DATABASE_PATH`
    #[arg(long, env = "DATABASE_PATH")]
    pub database_path: Option<PathBuf>,

    /// Random draws to try before scanning the whole pool for a free token.
    /// Defaults to twice the pool size.
    ///
    /// Environment variable: `MAX_SAMPLED_ATTEMPTS`
    #[arg(long, env = "MAX_SAMPLED_ATTEMPTS")]
    pub max_sampled_attempts: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub allocator: AllocatorConfig,
    pub server_addr: String,
    pub database_path: Option<PathBuf>,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let alphabet: Alphabet = match args.alphabet.parse() {
            Ok(alphabet) => alphabet,
            Err(e) => bail!("ALLCHARACTERS is not a valid alphabet: {e}"),
        };

        let mut allocator = AllocatorConfig::new(alphabet);
        if let Some(attempts) = args.max_sampled_attempts {
            allocator = allocator.with_max_sampled_attempts(attempts);
        }

        Ok(Self {
            allocator,
            server_addr: args.server_addr,
            database_path: args.database_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = std::iter::once("charpool-server").chain(args.iter().copied());
        let args = CliArgs::try_parse_from(argv)?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn defaults_derive_from_alphabet() {
        let config = parse(&["--alphabet", "ABCD"]).unwrap();
        assert_eq!(config.allocator.alphabet.len(), 4);
        assert_eq!(config.allocator.max_sampled_attempts, 8);
        assert_eq!(config.server_addr, "0.0.0.0:3000");
        assert_eq!(config.database_path, None);
    }

    #[test]
    fn explicit_values_win() {
        let config = parse(&[
            "--alphabet",
            "XYZ",
            "--max-sampled-attempts",
            "1",
            "--server-addr",
            "127.0.0.1:8080",
            "--database-path",
            "/tmp/charpool.redb",
        ])
        .unwrap();
        assert_eq!(config.allocator.max_sampled_attempts, 1);
        assert_eq!(config.server_addr, "127.0.0.1:8080");
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/tmp/charpool.redb"))
        );
    }

    #[test]
    fn rejects_invalid_alphabets() {
        assert!(parse(&["--alphabet", "ABA"]).is_err());
        assert!(parse(&["--alphabet", ""]).is_err());
    }
}
