use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use url::Url;

/// Where capability and file records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentBackendKind {
    /// Lost on restart
    Memory,
    /// One file per record under the data directory
    Fs,
}

/// How records are written into the document backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentEncoding {
    Json,
    /// DAG-CBOR
    Cbor,
}

/// Where file bytes are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectBackendKind {
    /// Lost on restart; download URLs point at the configured S3 endpoint
    Memory,
    /// An S3-compatible bucket
    S3,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP server (the default)
    Serve,
    /// Print a bearer token for a user
    Token {
        /// The user to issue the token for
        user: String,
    },
}

const MAX_SWEEP_GRACE_DAYS: i64 = 3650;

#[derive(Debug, Clone, Parser)]
#[command(name = "satchel")]
#[command(bin_name = "satchel")]
#[command(about = "Upload files and hand out expiring share links", long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(long, env = "SATCHEL_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "SATCHEL_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Base that share links are appended to
    #[arg(long, env = "SATCHEL_PUBLIC_URL", default_value = "http://localhost:8080/s")]
    pub public_url: Url,

    #[arg(long, env = "SATCHEL_DOCUMENTS", value_enum, default_value_t = DocumentBackendKind::Memory)]
    pub documents: DocumentBackendKind,

    #[arg(long, env = "SATCHEL_ENCODING", value_enum, default_value_t = DocumentEncoding::Json)]
    pub encoding: DocumentEncoding,

    #[arg(long, env = "SATCHEL_DATA_DIR", default_value = "satchel-data")]
    pub data_dir: PathBuf,

    #[arg(long, env = "SATCHEL_OBJECTS", value_enum, default_value_t = ObjectBackendKind::Memory)]
    pub objects: ObjectBackendKind,

    #[arg(long, env = "SATCHEL_S3_ENDPOINT", default_value = "http://localhost:9000")]
    pub s3_endpoint: String,

    #[arg(long, env = "SATCHEL_S3_REGION", default_value = "us-east-1")]
    pub s3_region: String,

    #[arg(long, env = "SATCHEL_S3_BUCKET", default_value = "satchel")]
    pub s3_bucket: String,

    #[arg(long, env = "SATCHEL_S3_ACCESS_KEY_ID", default_value = "satchel")]
    pub s3_access_key_id: String,

    #[arg(long, env = "SATCHEL_S3_SECRET_ACCESS_KEY", default_value = "", hide_env_values = true)]
    pub s3_secret_access_key: String,

    /// Longest lifetime of a download URL, in seconds (at most seven days)
    #[arg(
        long,
        env = "SATCHEL_CREDENTIAL_CEILING",
        default_value_t = 604_800,
        value_parser = clap::value_parser!(u64).range(1..=satchel_s3_credentials::MAX_EXPIRES)
    )]
    pub credential_ceiling: u64,

    /// Key for signing bearer tokens; a random one is used if absent
    #[arg(long, env = "SATCHEL_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Seconds before a request is abandoned
    #[arg(long, env = "SATCHEL_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "SATCHEL_MAX_UPLOAD", default_value_t = 25 * 1024 * 1024)]
    pub max_upload: usize,

    /// Seconds between cleanup passes over dead share links; 0 disables them
    #[arg(long, env = "SATCHEL_SWEEP_INTERVAL", default_value_t = 3600)]
    pub sweep_interval: u64,

    /// Days a dead share link stays listed before cleanup removes it
    #[arg(
        long,
        env = "SATCHEL_SWEEP_GRACE_DAYS",
        default_value_t = 7,
        value_parser = clap::value_parser!(i64).range(0..=MAX_SWEEP_GRACE_DAYS)
    )]
    pub sweep_grace_days: i64,
}

impl Config {
    pub fn address(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    pub fn sweep_grace(&self) -> chrono::Duration {
        chrono::Duration::days(self.sweep_grace_days.clamp(0, MAX_SWEEP_GRACE_DAYS))
    }

    /// The credential ceiling, kept within the S3 presign maximum.
    pub fn ceiling(&self) -> chrono::Duration {
        let seconds = self
            .credential_ceiling
            .clamp(1, satchel_s3_credentials::MAX_EXPIRES);
        chrono::Duration::seconds(seconds as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_has_usable_defaults() {
        let config = Config::try_parse_from(["satchel"]).unwrap();

        assert_eq!(config.address().unwrap().port(), 8080);
        assert_eq!(config.documents, DocumentBackendKind::Memory);
        assert_eq!(config.encoding, DocumentEncoding::Json);
        assert_eq!(config.objects, ObjectBackendKind::Memory);
        assert_eq!(config.credential_ceiling, 604_800);
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(3600)));
        assert!(config.command.is_none());
    }

    #[test]
    fn it_reads_flags_and_subcommands() {
        let config = Config::try_parse_from([
            "satchel",
            "--documents",
            "fs",
            "--objects",
            "s3",
            "--sweep-interval",
            "0",
            "--public-url",
            "https://share.example/s",
            "token",
            "alice",
        ])
        .unwrap();

        assert_eq!(config.documents, DocumentBackendKind::Fs);
        assert_eq!(config.objects, ObjectBackendKind::S3);
        assert_eq!(config.sweep_interval(), None);
        assert_eq!(config.public_url.as_str(), "https://share.example/s");
        assert!(matches!(config.command, Some(Command::Token { user }) if user == "alice"));
    }

    #[test]
    fn it_rejects_unknown_backends() {
        assert!(Config::try_parse_from(["satchel", "--documents", "postgres"]).is_err());
    }

    #[test]
    fn it_rejects_negative_or_huge_grace_periods() {
        for days in ["-7", "3651", "9223372036854775807"] {
            assert!(
                Config::try_parse_from(["satchel", "--sweep-grace-days", days]).is_err(),
                "{days}"
            );
        }

        let config = Config::try_parse_from(["satchel", "--sweep-grace-days", "0"]).unwrap();
        assert_eq!(config.sweep_grace(), chrono::Duration::zero());
    }

    #[test]
    fn it_bounds_the_credential_ceiling() {
        for seconds in ["0", "604801", "18446744073709551615"] {
            assert!(
                Config::try_parse_from(["satchel", "--credential-ceiling", seconds]).is_err(),
                "{seconds}"
            );
        }

        let config =
            Config::try_parse_from(["satchel", "--credential-ceiling", "600"]).unwrap();
        assert_eq!(config.ceiling(), chrono::Duration::minutes(10));
    }
}
