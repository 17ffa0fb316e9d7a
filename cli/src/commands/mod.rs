pub mod completion;
pub mod dn;
pub mod search;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ldap-lookup",
    author,
    version,
    about = "Configuration-driven LDAP lookups",
    long_about = "Search an LDAP directory once per term and shape the results.\n\nConnection and \
                  search options come from the ldap_lookup_config mapping in a vars file, from \
                  LDAP_LOOKUP_* environment variables, from named contexts and from --set."
)]
pub struct Cli {
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "More log output (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence"
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace"
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run a lookup and print the records as JSON")]
    Search(search::SearchArgs),

    #[command(about = "Convert a host name into a dc= distinguished name")]
    HostnameToDn(dn::HostnameArgs),

    #[command(about = "Convert a dc= distinguished name into a host name")]
    DnToHostname(dn::DnArgs),

    #[command(about = "Generate shell completions")]
    Completion(completion::CompletionArgs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_verbosity() {
        let quiet = Cli::parse_from(["ldap-lookup", "hostname-to-dn", "a.b"]);
        assert_eq!(quiet.log_level(), "warn");

        let debug = Cli::parse_from(["ldap-lookup", "-vv", "hostname-to-dn", "a.b"]);
        assert_eq!(debug.log_level(), "debug");

        let trace = Cli::parse_from(["ldap-lookup", "hostname-to-dn", "a.b", "-vvvv"]);
        assert_eq!(trace.log_level(), "trace");
    }
}
