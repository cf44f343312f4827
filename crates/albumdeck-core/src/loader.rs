//! Folder metadata and playlist loading
//!
//! Every album folder under the songs root carries an `info.json` that names
//! its tracks in playback order. Reads are never cached: each load or hover
//! goes back to disk.

use std::io;
use std::path::{ Path, PathBuf };

use serde::de::{ self, Deserializer };
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::playlist::Playlist;


/// Name of the per-folder metadata document.
pub const INFO_FILE: &str = "info.json";


/// Errors that can occur while loading a folder.
#[derive( Debug, Error )]
pub enum LoadError {
    #[error( "No info.json in folder '{folder}'" )]
    NotFound { folder: String },

    #[error( "IO error reading '{folder}': {source}" )]
    Io {
        folder: String,
        #[source]
        source: io::Error,
    },

    #[error( "Malformed info.json in '{folder}': {source}" )]
    Malformed {
        folder: String,
        #[source]
        source: serde_json::Error,
    },

    #[error( "No songs array in info.json for '{folder}'" )]
    MissingSongs { folder: String },
}


impl LoadError {
    /// Text shown to the user when a load fails.
    pub fn user_message( &self ) -> String {
        match self {
            LoadError::NotFound { folder } => format!( "No songs found in {}", folder ),
            LoadError::MissingSongs { .. } => format!( "No songs array in {}", INFO_FILE ),
            LoadError::Io { folder, .. } | LoadError::Malformed { folder, .. } => {
                format!( "Error loading {}", folder )
            }
        }
    }
}


/// Contents of a folder's `info.json`.
#[derive( Debug, Clone, Default, PartialEq, Eq, Deserialize )]
#[serde( default )]
pub struct FolderMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Track file names. Anything but an array reads as absent.
    #[serde( deserialize_with = "songs_array" )]
    pub songs: Option<Vec<String>>,
}


fn songs_array<'de, D>( deserializer: D ) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array( items ) = Value::deserialize( deserializer )? else {
        return Ok( None );
    };

    items
        .into_iter()
        .map( |item| match item {
            Value::String( name ) => Ok( name ),
            other => Err( de::Error::custom( format!( "song entry is not a string: {}", other ) ) ),
        })
        .collect::<Result<Vec<_>, _>>()
        .map( Some )
}


/// A successfully loaded folder.
#[derive( Debug, Clone )]
pub struct LoadedFolder {
    pub folder: String,
    pub info: FolderMetadata,
    pub playlist: Playlist,
}


/// Reads folder metadata from the songs root and builds playlists.
#[derive( Debug, Clone )]
pub struct PlaylistLoader {
    root: PathBuf,
}


impl PlaylistLoader {
    /// Creates a loader rooted at the songs directory.
    pub fn new( root: impl Into<PathBuf> ) -> Self {
        Self { root: root.into() }
    }


    /// Gets the songs root.
    pub fn root( &self ) -> &Path {
        &self.root
    }


    /// Resolves a track: `<root>/<folder>/<filename>`.
    pub fn track_path( &self, folder: &str, filename: &str ) -> PathBuf {
        self.root.join( folder ).join( filename )
    }


    /// Location of a folder's metadata document.
    pub fn info_path( &self, folder: &str ) -> PathBuf {
        self.root.join( folder ).join( INFO_FILE )
    }


    /// Reads and parses a folder's metadata.
    ///
    /// A single read, no retries.
    pub async fn fetch_info( &self, folder: &str ) -> Result<FolderMetadata, LoadError> {
        let path = self.info_path( folder );

        let contents = tokio::fs::read_to_string( &path ).await.map_err( |e| {
            if e.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound { folder: folder.to_string() }
            } else {
                LoadError::Io { folder: folder.to_string(), source: e }
            }
        })?;

        serde_json::from_str( &contents )
            .map_err( |e| LoadError::Malformed { folder: folder.to_string(), source: e } )
    }


    /// Loads a folder's playlist in the order declared by its metadata.
    pub async fn load( &self, folder: &str ) -> Result<LoadedFolder, LoadError> {
        let info = self.fetch_info( folder ).await?;

        let songs = info.songs.as_ref()
            .ok_or_else( || LoadError::MissingSongs { folder: folder.to_string() } )?;

        let tracks: Vec<PathBuf> = songs
            .iter()
            .map( |song| self.track_path( folder, song ) )
            .collect();

        tracing::info!( "Loaded {} songs from {}", tracks.len(), folder );

        Ok( LoadedFolder {
            folder: folder.to_string(),
            info,
            playlist: Playlist::from_tracks( tracks ),
        })
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use std::fs;


    fn write_info( root: &Path, folder: &str, json: &str ) {
        let dir = root.join( folder );
        fs::create_dir_all( &dir ).unwrap();
        fs::write( dir.join( INFO_FILE ), json ).unwrap();
    }


    #[tokio::test]
    async fn test_load_keeps_declared_order() {
        let root = tempfile::tempdir().unwrap();
        write_info( root.path(), "jazz", r#"{"songs": ["a.mp3", "b.mp3"]}"# );

        let loader = PlaylistLoader::new( root.path() );
        let loaded = loader.load( "jazz" ).await.unwrap();

        assert_eq!( loaded.folder, "jazz" );
        assert_eq!( loaded.playlist.tracks(), &[
            root.path().join( "jazz" ).join( "a.mp3" ),
            root.path().join( "jazz" ).join( "b.mp3" ),
        ]);
        assert_eq!( loaded.playlist.cursor(), 0 );
    }


    #[tokio::test]
    async fn test_load_does_not_dedup_or_sort() {
        let root = tempfile::tempdir().unwrap();
        write_info( root.path(), "mix", r#"{"songs": ["z.mp3", "a.mp3", "z.mp3"]}"# );

        let loaded = PlaylistLoader::new( root.path() ).load( "mix" ).await.unwrap();
        let names: Vec<_> = loaded.playlist.tracks()
            .iter()
            .map( |p| p.file_name().unwrap().to_string_lossy().to_string() )
            .collect();
        assert_eq!( names, [ "z.mp3", "a.mp3", "z.mp3" ] );
    }


    #[tokio::test]
    async fn test_missing_info_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let err = PlaylistLoader::new( root.path() ).load( "ghost" ).await.unwrap_err();

        assert!( matches!( err, LoadError::NotFound { .. } ) );
        assert_eq!( err.user_message(), "No songs found in ghost" );
    }


    #[tokio::test]
    async fn test_missing_songs_array() {
        let root = tempfile::tempdir().unwrap();
        write_info( root.path(), "bare", r#"{"title": "Bare", "description": "nothing"}"# );

        let loader = PlaylistLoader::new( root.path() );
        let err = loader.load( "bare" ).await.unwrap_err();
        assert!( matches!( err, LoadError::MissingSongs { .. } ) );

        // Hover info still works without songs.
        let info = loader.fetch_info( "bare" ).await.unwrap();
        assert_eq!( info.title.as_deref(), Some( "Bare" ) );
    }


    #[tokio::test]
    async fn test_songs_that_is_not_an_array_is_missing() {
        let root = tempfile::tempdir().unwrap();
        write_info( root.path(), "odd", r#"{"title": "Odd", "songs": "a.mp3"}"# );
        write_info( root.path(), "null", r#"{"songs": null}"# );

        let loader = PlaylistLoader::new( root.path() );
        let err = loader.load( "odd" ).await.unwrap_err();
        assert!( matches!( err, LoadError::MissingSongs { .. } ) );
        assert_eq!( err.user_message(), "No songs array in info.json" );
        assert!( matches!( loader.load( "null" ).await, Err( LoadError::MissingSongs { .. } ) ) );

        let info = loader.fetch_info( "odd" ).await.unwrap();
        assert_eq!( info.title.as_deref(), Some( "Odd" ) );
    }


    #[tokio::test]
    async fn test_non_string_song_entry_is_malformed() {
        let root = tempfile::tempdir().unwrap();
        write_info( root.path(), "mixed", r#"{"songs": ["a.mp3", 7]}"# );

        let err = PlaylistLoader::new( root.path() ).load( "mixed" ).await.unwrap_err();
        assert!( matches!( err, LoadError::Malformed { .. } ) );
        assert_eq!( err.user_message(), "Error loading mixed" );
    }
}
