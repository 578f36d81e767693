use std::path::PathBuf;

use clap::Subcommand;
use buggyfocus_core::{Config, HostsFile};

#[derive(Subcommand)]
pub enum HostsAction {
    /// Remove a block left behind by a session that did not shut down cleanly
    Clean {
        /// Hosts file to clean instead of blocking.hosts_path
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print the hosts file path in use
    Path,
}

pub fn run(action: HostsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();

    match action {
        HostsAction::Clean { path } => {
            let path = path.unwrap_or(config.blocking.hosts_path);
            let hosts = HostsFile::new(&path, config.blocking.redirect_address);
            if !hosts.unblock() {
                return Err(format!(
                    "could not rewrite {} (try running with administrator rights)",
                    path.display()
                )
                .into());
            }
            println!("ok");
        }
        HostsAction::Path => {
            println!("{}", config.blocking.hosts_path.display());
        }
    }
    Ok(())
}
