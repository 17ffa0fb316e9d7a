use colored::Colorize;
use errors::LookupError;

#[derive(Debug)]
pub struct UxError {
    pub what: String,
    pub why: Option<String>,
    pub how_to_fix: Vec<String>,
    pub suggested_command: Option<String>
}

impl UxError {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            why: None,
            how_to_fix: Vec::new(),
            suggested_command: None
        }
    }

    pub fn why(mut self, reason: impl Into<String>) -> Self {
        self.why = Some(reason.into());
        self
    }

    pub fn fix(mut self, suggestion: impl Into<String>) -> Self {
        self.how_to_fix.push(suggestion.into());
        self
    }

    pub fn suggest(mut self, cmd: impl Into<String>) -> Self {
        self.suggested_command = Some(cmd.into());
        self
    }

    pub fn display(&self) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), self.what.white().bold());

        if let Some(why) = &self.why {
            eprintln!("       {}", why.dimmed());
        }

        if !self.how_to_fix.is_empty() {
            eprintln!();
            eprintln!("{}", "How to fix:".yellow().bold());
            for (i, fix) in self.how_to_fix.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, fix);
            }
        }

        if let Some(cmd) = &self.suggested_command {
            eprintln!();
            eprintln!("{}", "Try this:".green().bold());
            eprintln!("  $ {}", cmd.cyan());
        }
        eprintln!();
    }
}

impl std::fmt::Display for UxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.what)
    }
}

impl std::error::Error for UxError {}

pub fn from_lookup_error(err: &LookupError) -> UxError {
    let what = err.to_string();
    match err {
        LookupError::Configuration { .. } => UxError::new(what)
            .why("The lookup options could not be resolved")
            .fix("Check ldap_lookup_config and named contexts in the vars file")
            .fix("Check LDAP_LOOKUP_* environment variables and --set values")
            .suggest("ldap-lookup search -vv --vars vars.yaml <term>"),
        LookupError::Directory { operation, .. } => UxError::new(what)
            .why(format!("The directory server rejected or failed the {operation}"))
            .fix("Verify url, binddn and bindpw")
            .fix("Check the search filter syntax")
            .fix("Raise timeout for slow servers"),
        LookupError::MissingAttribute { attribute, .. } => UxError::new(what)
            .why(format!("Keyed output needs {attribute} on every matching entry"))
            .fix("Narrow the filter to entries that carry the key attribute")
            .fix("Or key by dn or term instead"),
        LookupError::Usage { .. } => UxError::new(what)
            .fix("Pass --layer mappings before any search term"),
        LookupError::ValueDecode { attribute, .. } => UxError::new(what)
            .why(format!("{attribute} holds bytes that are not valid in the chosen encoding"))
            .fix("Use encoding=binary for opaque values"),
        LookupError::InvalidDn { .. } => UxError::new(what)
            .fix("Every RDN must be a dc= component, e.g. DC=some,DC=corp,DC=com")
    }
}
