//! Playlist and cursor management
//!
//! A playlist is the ordered track list of one album folder plus a cursor.
//! It is replaced wholesale on every folder load, never edited in place.

use std::path::{ Path, PathBuf };


/// Ordered tracks of one folder with a wrapping cursor.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct Playlist {
    tracks: Vec<PathBuf>,
    cursor: usize,
}


impl Playlist {
    /// Creates a new empty playlist.
    pub fn new() -> Self {
        Self::default()
    }


    /// Creates a playlist from tracks in playback order, cursor at 0.
    pub fn from_tracks( tracks: Vec<PathBuf> ) -> Self {
        Self { tracks, cursor: 0 }
    }


    /// Gets the track under the cursor.
    pub fn current( &self ) -> Option<&PathBuf> {
        self.tracks.get( self.cursor )
    }


    /// Advances the cursor by one with wraparound.
    ///
    /// Returns None and leaves the cursor alone when the playlist is empty.
    pub fn next( &mut self ) -> Option<&PathBuf> {
        if self.tracks.is_empty() {
            return None;
        }

        self.cursor = ( self.cursor + 1 ) % self.tracks.len();
        self.current()
    }


    /// Moves the cursor back by one with wraparound.
    pub fn previous( &mut self ) -> Option<&PathBuf> {
        if self.tracks.is_empty() {
            return None;
        }

        let len = self.tracks.len();
        self.cursor = ( self.cursor + len - 1 ) % len;
        self.current()
    }


    /// Jumps to a specific track by index.
    pub fn jump_to( &mut self, index: usize ) -> Option<&PathBuf> {
        if index < self.tracks.len() {
            self.cursor = index;
            self.current()
        } else {
            None
        }
    }


    /// Gets all tracks in the playlist.
    pub fn tracks( &self ) -> &[PathBuf] {
        &self.tracks
    }


    /// Gets the number of tracks.
    pub fn len( &self ) -> usize {
        self.tracks.len()
    }


    /// Returns true if the playlist is empty.
    pub fn is_empty( &self ) -> bool {
        self.tracks.is_empty()
    }


    /// Gets the cursor position.
    pub fn cursor( &self ) -> usize {
        self.cursor
    }
}


/// Display name of a track: the file name without directories or extension.
pub fn display_name( path: &Path ) -> String {
    path.file_stem()
        .or_else( || path.file_name() )
        .map( |n| n.to_string_lossy().to_string() )
        .unwrap_or_else( || path.display().to_string() )
}


#[cfg( test )]
mod tests {
    use super::*;


    fn playlist( n: usize ) -> Playlist {
        Playlist::from_tracks(
            ( 0..n ).map( |i| PathBuf::from( format!( "songs/demo/{}.mp3", i ) ) ).collect()
        )
    }


    #[test]
    fn test_next_cycles_back_to_start() {
        for n in 1..6 {
            let mut list = playlist( n );
            list.jump_to( n / 2 );
            let start = list.cursor();

            let mut visited = Vec::new();
            for _ in 0..n {
                list.next();
                visited.push( list.cursor() );
            }

            let expected: Vec<usize> = ( 1..=n ).map( |k| ( start + k ) % n ).collect();
            assert_eq!( visited, expected );
            assert_eq!( list.cursor(), start );
        }
    }


    #[test]
    fn test_previous_inverts_next() {
        let mut list = playlist( 4 );
        for i in 0..4 {
            list.jump_to( i );
            list.next();
            list.previous();
            assert_eq!( list.cursor(), i );
        }
    }


    #[test]
    fn test_previous_wraps_to_end() {
        let mut list = playlist( 3 );
        assert_eq!( list.previous(), Some( &PathBuf::from( "songs/demo/2.mp3" ) ) );
    }


    #[test]
    fn test_empty_playlist_keeps_cursor() {
        let mut list = Playlist::new();
        assert!( list.next().is_none() );
        assert!( list.previous().is_none() );
        assert_eq!( list.cursor(), 0 );
        assert!( list.current().is_none() );
    }


    #[test]
    fn test_jump_out_of_range() {
        let mut list = playlist( 2 );
        assert!( list.jump_to( 2 ).is_none() );
        assert_eq!( list.cursor(), 0 );
    }


    #[test]
    fn test_display_name_strips_path_and_extension() {
        assert_eq!( display_name( Path::new( "songs/jazz/So What.mp3" ) ), "So What" );
        assert_eq!( display_name( Path::new( "track" ) ), "track" );
    }
}
