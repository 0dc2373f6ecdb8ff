//! Command-line interface for the dirq directory query tool.

use clap::Parser;
use dirq_directory::{DEFAULT_INDENT_WIDTH, DEFAULT_URL};
use std::path::PathBuf;

/// Query a directory server and print the entries beneath a search base.
///
/// Exit status: 0 on success, 2 for usage or configuration errors, 3 for
/// connection failures, 4 for authentication failures, 5 for search failures,
/// 6 when an operation times out.
#[derive(Parser, Debug)]
#[command(name = "dirq", version, about, long_about = None)]
pub struct Cli {
    /// Directory server URL, ldap:// or ldaps://
    #[arg(short = 'H', long = "url", value_name = "URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Bind DN for authentication (empty = anonymous bind)
    #[arg(short = 'u', long = "bind-dn", value_name = "DN", default_value = "")]
    pub bind_dn: String,

    /// Bind password for authentication
    #[arg(short = 'p', long = "password", value_name = "PASSWORD", default_value = "")]
    pub password: String,

    /// Base DN the search starts from
    #[arg(short = 'b', long = "base-dn", value_name = "DN", default_value = "")]
    pub base_dn: String,

    /// Maximum number of entries the server should return (0 = unlimited)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub size_limit: i32,

    /// Server-side time limit for the search in seconds (0 = unlimited)
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    pub time_limit: i32,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub connect_timeout: Option<u64>,

    /// Per-operation timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub operation_timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub no_tls_verify: bool,

    /// Path to a custom CA certificate for TLS verification
    #[arg(long, value_name = "FILE")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Indentation width for attribute lines
    #[arg(long, value_name = "WIDTH", default_value_t = DEFAULT_INDENT_WIDTH)]
    pub indent: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_shape() {
        let cli = Cli::parse_from(["dirq", "-b", "dc=example,dc=org"]);
        assert_eq!(cli.url, DEFAULT_URL);
        assert_eq!(cli.bind_dn, "");
        assert_eq!(cli.password, "");
        assert_eq!(cli.base_dn, "dc=example,dc=org");
        assert_eq!(cli.size_limit, 0);
        assert_eq!(cli.time_limit, 0);
        assert_eq!(cli.indent, 4);
        assert!(!cli.no_tls_verify);
    }

    #[test]
    fn short_flags_parse() {
        let cli = Cli::parse_from([
            "dirq",
            "-H",
            "ldaps://dir.example.org:636",
            "-u",
            "cn=admin,dc=example,dc=org",
            "-p",
            "secret",
            "-b",
            "dc=example,dc=org",
        ]);
        assert_eq!(cli.url, "ldaps://dir.example.org:636");
        assert_eq!(cli.bind_dn, "cn=admin,dc=example,dc=org");
        assert_eq!(cli.password, "secret");
    }

    #[test]
    fn positional_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["dirq", "-b", "dc=example,dc=org", "stray"]).is_err());
    }
}
