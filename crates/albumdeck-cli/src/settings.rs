//! Application settings management
//!
//! Settings live in `settings.json` under the user config directory.
//! Missing or unreadable files fall back to defaults.

use std::fs;
use std::path::{ Path, PathBuf };

use albumdeck_core::album::DEFAULT_COVER_NAMES;
use serde::{ Deserialize, Serialize };


/// Songs directory used when neither the CLI nor settings name one.
const DEFAULT_SONGS_DIR: &str = "songs";


/// Application settings.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// Directory holding one folder per album
    pub songs_dir: Option<PathBuf>,

    /// Seconds a notification stays on the status line
    pub notification_secs: u64,

    /// Consecutive unplayable tracks to skip before stopping.
    /// Unset means the length of the playlist.
    pub skip_limit: Option<usize>,

    /// Cover image file names, tried in order
    pub cover_names: Vec<String>,
}


impl Default for Settings {
    fn default() -> Self {
        Self {
            songs_dir: None,
            notification_secs: 3,
            skip_limit: None,
            cover_names: DEFAULT_COVER_NAMES.iter().map( |s| s.to_string() ).collect(),
        }
    }
}


impl Settings {
    /// Returns the path to the settings file.
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "albumdeck" ).join( "settings.json" ) )
    }


    /// Loads settings from the config directory, or defaults.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some( path ) => Self::load_from( &path ),
            None => Self::default(),
        }
    }


    /// Loads settings from a specific file, or defaults.
    pub fn load_from( path: &Path ) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( path ) {
            Ok( contents ) => serde_json::from_str( &contents ).unwrap_or_else( |e| {
                tracing::warn!( "Ignoring malformed settings {:?}: {}", path, e );
                Self::default()
            }),
            Err( e ) => {
                tracing::warn!( "Failed to read settings: {}", e );
                Self::default()
            }
        }
    }


    /// Resolves the songs directory: CLI flag, then settings, then `./songs`.
    pub fn songs_dir( &self, cli: Option<&Path> ) -> PathBuf {
        cli.map( Path::to_path_buf )
            .or_else( || self.songs_dir.clone() )
            .unwrap_or_else( || PathBuf::from( DEFAULT_SONGS_DIR ) )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!( Settings::load_from( &dir.path().join( "none.json" ) ), Settings::default() );
    }


    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "settings.json" );
        fs::write( &path, r#"{"songs_dir": "/srv/music", "skip_limit": 5}"# ).unwrap();

        let settings = Settings::load_from( &path );
        assert_eq!( settings.songs_dir, Some( PathBuf::from( "/srv/music" ) ) );
        assert_eq!( settings.skip_limit, Some( 5 ) );
        assert_eq!( settings.notification_secs, 3 );
        assert_eq!( settings.cover_names, Settings::default().cover_names );
    }


    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "settings.json" );
        fs::write( &path, "{ not json" ).unwrap();
        assert_eq!( Settings::load_from( &path ), Settings::default() );
    }


    #[test]
    fn test_songs_dir_precedence() {
        let settings = Settings {
            songs_dir: Some( PathBuf::from( "/from/settings" ) ),
            ..Settings::default()
        };
        assert_eq!( settings.songs_dir( Some( Path::new( "/from/cli" ) ) ), PathBuf::from( "/from/cli" ) );
        assert_eq!( settings.songs_dir( None ), PathBuf::from( "/from/settings" ) );
        assert_eq!( Settings::default().songs_dir( None ), PathBuf::from( "songs" ) );
    }
}
