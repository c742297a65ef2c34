use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use spectra_core::config::SessionConfig;
use spectra_core::session::Session;

use crate::repl::Repl;

#[derive(Args)]
pub struct SessionArgs {
    /// Image or spectrum to open at start
    pub file: Option<PathBuf>,
}

pub fn run(args: &SessionArgs, config: SessionConfig) -> Result<()> {
    let mut session = Session::new(config)?;
    if let Some(ref path) = args.file {
        let status = session.open(path)?;
        println!("{status}");
    }
    Repl::new(session).run()
}
