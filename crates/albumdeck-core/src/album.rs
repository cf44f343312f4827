//! Album shelf
//!
//! Lists the album folders under the songs root, tracks which one is
//! selected, and holds whatever hover info has been fetched for each.

use std::fs;
use std::path::{ Component, Path, PathBuf };

use crate::loader::FolderMetadata;


/// Cover image names tried in order.
pub const DEFAULT_COVER_NAMES: &[&str] = &[ "cover.jpg", "cover.png", "folder.jpg" ];


/// One album folder on the shelf.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct AlbumCard {
    pub folder: String,
    pub cover: PathBuf,
    /// False when no cover image could be found
    pub cover_loaded: bool,
    pub info: Option<FolderMetadata>,
}


impl AlbumCard {
    /// Builds a card from its cover location.
    ///
    /// Returns None when the cover does not sit inside a folder under `root`.
    pub fn from_cover( root: &Path, cover: PathBuf ) -> Option<Self> {
        let folder = folder_from_cover( root, &cover )?;
        let cover_loaded = cover.is_file();
        if !cover_loaded {
            tracing::warn!( "Failed to load cover: {:?}", cover );
        }

        Some( Self {
            folder,
            cover,
            cover_loaded,
            info: None,
        })
    }


    /// Text to show for the card.
    ///
    /// Prefers the fetched title, then the folder name, and falls back to
    /// a placeholder derived from the folder name when the cover is missing.
    pub fn label( &self ) -> String {
        if let Some( title ) = self.info.as_ref().and_then( |i| i.title.as_ref() ) {
            return title.clone();
        }
        if self.cover_loaded {
            self.folder.clone()
        } else {
            placeholder_label( &self.folder )
        }
    }


    /// Description from hover info, or empty.
    pub fn description( &self ) -> &str {
        self.info.as_ref()
            .and_then( |i| i.description.as_deref() )
            .unwrap_or( "" )
    }
}


/// Resolves a folder identifier from a cover location.
///
/// The identifier is the path component right after `root`.
pub fn folder_from_cover( root: &Path, cover: &Path ) -> Option<String> {
    let rest = cover.strip_prefix( root ).ok()?;
    let mut components = rest.components();

    let folder = match components.next()? {
        Component::Normal( name ) => name.to_string_lossy().to_string(),
        _ => return None,
    };

    // The cover itself must live inside the folder.
    components.next()?;
    Some( folder )
}


/// Placeholder text for a folder with no cover.
///
/// Underscores become spaces and parenthetical groups are dropped.
pub fn placeholder_label( folder: &str ) -> String {
    let spaced = folder.replace( '_', " " );
    let mut out = String::with_capacity( spaced.len() );
    let mut rest = spaced.as_str();

    while let Some( open ) = rest.find( '(' ) {
        match rest[ open.. ].find( ')' ) {
            Some( close ) => {
                out.push_str( &rest[ ..open ] );
                rest = &rest[ open + close + 1.. ];
            }
            None => break,
        }
    }
    out.push_str( rest );

    out.trim().to_string()
}


/// The list of albums with a wrapping selection.
#[derive( Debug, Default )]
pub struct AlbumShelf {
    root: PathBuf,
    cards: Vec<AlbumCard>,
    selected: usize,
}


impl AlbumShelf {
    /// Scans `root` for album folders.
    ///
    /// Hidden directories are skipped. An unreadable root yields an empty
    /// shelf.
    pub fn scan( root: &Path, cover_names: &[String] ) -> Self {
        let mut folders: Vec<PathBuf> = match fs::read_dir( root ) {
            Ok( entries ) => entries
                .flatten()
                .map( |e| e.path() )
                .filter( |p| p.is_dir() )
                .filter( |p| {
                    p.file_name()
                        .map( |n| !n.to_string_lossy().starts_with( '.' ) )
                        .unwrap_or( false )
                })
                .collect(),
            Err( e ) => {
                tracing::warn!( "Cannot read songs directory {:?}: {}", root, e );
                Vec::new()
            }
        };

        folders.sort_by_key( |p| p.to_string_lossy().to_lowercase() );

        let cards: Vec<AlbumCard> = folders
            .iter()
            .filter_map( |dir| AlbumCard::from_cover( root, find_cover( dir, cover_names ) ) )
            .collect();

        tracing::info!( "Found {} album folders in {:?}", cards.len(), root );

        Self {
            root: root.to_path_buf(),
            cards,
            selected: 0,
        }
    }


    pub fn root( &self ) -> &Path {
        &self.root
    }


    pub fn cards( &self ) -> &[AlbumCard] {
        &self.cards
    }


    pub fn len( &self ) -> usize {
        self.cards.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.cards.is_empty()
    }


    pub fn selected_index( &self ) -> usize {
        self.selected
    }


    pub fn selected( &self ) -> Option<&AlbumCard> {
        self.cards.get( self.selected )
    }


    /// Selects a card by index. Out of range is ignored.
    pub fn select( &mut self, index: usize ) -> Option<&AlbumCard> {
        if index < self.cards.len() {
            self.selected = index;
        }
        self.selected()
    }


    /// Moves selection down.
    pub fn select_next( &mut self ) -> Option<&AlbumCard> {
        if !self.cards.is_empty() {
            self.selected = ( self.selected + 1 ) % self.cards.len();
        }
        self.selected()
    }


    /// Moves selection up.
    pub fn select_previous( &mut self ) -> Option<&AlbumCard> {
        if !self.cards.is_empty() {
            self.selected = ( self.selected + self.cards.len() - 1 ) % self.cards.len();
        }
        self.selected()
    }


    /// Stores hover info for a folder.
    pub fn set_info( &mut self, folder: &str, info: FolderMetadata ) {
        if let Some( card ) = self.cards.iter_mut().find( |c| c.folder == folder ) {
            card.info = Some( info );
        }
    }
}


fn find_cover( dir: &Path, cover_names: &[String] ) -> PathBuf {
    cover_names
        .iter()
        .map( |name| dir.join( name ) )
        .find( |p| p.is_file() )
        .unwrap_or_else( || {
            dir.join( cover_names.first().map( String::as_str ).unwrap_or( DEFAULT_COVER_NAMES[ 0 ] ) )
        })
}


#[cfg( test )]
mod tests {
    use super::*;


    fn names() -> Vec<String> {
        DEFAULT_COVER_NAMES.iter().map( |s| s.to_string() ).collect()
    }


    #[test]
    fn test_placeholder_label() {
        assert_eq!( placeholder_label( "Lo_Fi_Beats" ), "Lo Fi Beats" );
        assert_eq!( placeholder_label( "Kind_of_Blue_(1959)" ), "Kind of Blue" );
        assert_eq!( placeholder_label( "A_(x)_B_(y)" ), "A  B" );
        assert_eq!( placeholder_label( "Open_(paren" ), "Open (paren" );
    }


    #[test]
    fn test_folder_from_cover() {
        let root = Path::new( "/music/songs" );
        assert_eq!(
            folder_from_cover( root, Path::new( "/music/songs/jazz/cover.jpg" ) ).as_deref(),
            Some( "jazz" )
        );
        assert_eq!( folder_from_cover( root, Path::new( "/music/songs/cover.jpg" ) ), None );
        assert_eq!( folder_from_cover( root, Path::new( "/elsewhere/jazz/cover.jpg" ) ), None );
    }


    #[test]
    fn test_scan_finds_albums_and_covers() {
        let root = tempfile::tempdir().unwrap();
        for folder in [ "rock", "Jazz_(Live)", ".hidden" ] {
            fs::create_dir_all( root.path().join( folder ) ).unwrap();
        }
        fs::write( root.path().join( "rock" ).join( "folder.jpg" ), b"img" ).unwrap();
        fs::write( root.path().join( "stray.txt" ), b"x" ).unwrap();

        let shelf = AlbumShelf::scan( root.path(), &names() );
        let folders: Vec<_> = shelf.cards().iter().map( |c| c.folder.as_str() ).collect();
        assert_eq!( folders, [ "Jazz_(Live)", "rock" ] );

        let jazz = &shelf.cards()[ 0 ];
        assert!( !jazz.cover_loaded );
        assert_eq!( jazz.label(), "Jazz" );

        let rock = &shelf.cards()[ 1 ];
        assert!( rock.cover_loaded );
        assert!( rock.cover.ends_with( "folder.jpg" ) );
        assert_eq!( rock.label(), "rock" );
    }


    #[test]
    fn test_hover_info_overrides_label() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all( root.path().join( "jazz" ) ).unwrap();

        let mut shelf = AlbumShelf::scan( root.path(), &names() );
        shelf.set_info( "jazz", FolderMetadata {
            title: Some( "Late Night Jazz".into() ),
            description: Some( "Smooth".into() ),
            songs: None,
        });

        let card = shelf.selected().unwrap();
        assert_eq!( card.label(), "Late Night Jazz" );
        assert_eq!( card.description(), "Smooth" );
    }


    #[test]
    fn test_selection_wraps() {
        let root = tempfile::tempdir().unwrap();
        for folder in [ "a", "b", "c" ] {
            fs::create_dir_all( root.path().join( folder ) ).unwrap();
        }

        let mut shelf = AlbumShelf::scan( root.path(), &names() );
        assert_eq!( shelf.select_previous().map( |c| c.folder.as_str() ), Some( "c" ) );
        assert_eq!( shelf.select_next().map( |c| c.folder.as_str() ), Some( "a" ) );
        assert_eq!( shelf.select( 7 ).map( |c| c.folder.as_str() ), Some( "a" ) );
    }


    #[test]
    fn test_missing_root_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let shelf = AlbumShelf::scan( &root.path().join( "nope" ), &names() );
        assert!( shelf.is_empty() );
        assert!( shelf.selected().is_none() );
    }
}
