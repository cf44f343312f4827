//! View mode management for the TUI.


/// Current view mode of the application.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum ViewMode {
    /// Album shelf - the folders under the songs directory.
    #[default]
    Albums,

    /// Playlist view - tracks of the loaded album.
    Playlist,

    /// Help overlay - shows available commands.
    Help,
}


impl ViewMode {
    /// Returns the next view in tab order.
    pub fn next_tab( self ) -> Self {
        match self {
            ViewMode::Albums => ViewMode::Playlist,
            ViewMode::Playlist => ViewMode::Albums,
            ViewMode::Help => ViewMode::Help, // Help stays until dismissed
        }
    }


    /// Header label for the view.
    pub fn title( self ) -> &'static str {
        match self {
            ViewMode::Albums => "ALBUMS",
            ViewMode::Playlist => "PLAYLIST",
            ViewMode::Help => "HELP",
        }
    }
}
