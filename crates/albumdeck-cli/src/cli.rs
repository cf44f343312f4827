//! Command-line argument parsing for Albumdeck.

use std::path::PathBuf;

use clap::Parser;


/// Albumdeck - play album folders from the terminal.
#[derive( Parser, Debug )]
#[command( name = "albumdeck" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Songs directory holding one folder per album.
    #[arg( short, long )]
    pub songs: Option<PathBuf>,

    /// Album folder to load and play on startup.
    #[arg( short, long )]
    pub album: Option<String>,

    /// Write logs here instead of the default data directory.
    #[arg( long )]
    pub log_file: Option<PathBuf>,
}
