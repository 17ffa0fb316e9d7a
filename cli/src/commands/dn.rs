use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct HostnameArgs {
    #[arg(help = "Host name, e.g. some.corp.com")]
    pub hostname: String
}

#[derive(Args)]
pub struct DnArgs {
    #[arg(help = "Distinguished name made of dc= components, e.g. DC=some,DC=corp,DC=com")]
    pub dn: String
}

pub fn hostname_to_dn(args: HostnameArgs) -> Result<()> {
    println!("{}", ldap_lookup::hostname_to_dn(&args.hostname)?);
    Ok(())
}

pub fn dn_to_hostname(args: DnArgs) -> Result<()> {
    println!("{}", ldap_lookup::dn_to_hostname(&args.dn)?);
    Ok(())
}
