//! Log file setup.
//!
//! The TUI owns the terminal, so tracing output goes to a file.

use std::fs::{ self, OpenOptions };
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{ anyhow, Context, Result };
use tracing_subscriber::EnvFilter;


/// Default log location: `<data_local_dir>/albumdeck/albumdeck.log`.
fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else( std::env::temp_dir )
        .join( "albumdeck" )
        .join( "albumdeck.log" )
}


/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// @returns The file being written to
pub fn init( log_file: Option<PathBuf> ) -> Result<PathBuf> {
    let path = log_file.unwrap_or_else( default_log_path );

    if let Some( parent ) = path.parent().filter( |p| !p.as_os_str().is_empty() ) {
        fs::create_dir_all( parent )
            .with_context( || format!( "creating log directory {:?}", parent ) )?;
    }

    let file = OpenOptions::new()
        .create( true )
        .append( true )
        .open( &path )
        .with_context( || format!( "opening log file {:?}", path ) )?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else( |_| EnvFilter::new( "info" ) );

    tracing_subscriber::fmt()
        .with_writer( Mutex::new( file ) )
        .with_ansi( false )
        .with_target( true )
        .with_env_filter( filter )
        .try_init()
        .map_err( |e| anyhow!( "installing log subscriber: {}", e ) )?;

    Ok( path )
}
