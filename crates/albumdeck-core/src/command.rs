//! Slash command parsing.
//!
//! Commands are typed into the status line after a `/` and map one to one
//! onto playback controller operations.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::time::parse_time;


/// Why a typed command was refused. Shown as a notification.
#[derive( Debug, Error )]
pub enum CommandError {
    #[error( "No such command: /{0}" )]
    Unknown( String ),

    #[error( "{0}" )]
    InvalidArgument( String ),

    #[error( "Expected a {0}" )]
    MissingArgument( String ),
}


/// Where to seek to.
#[derive( Debug, Clone, Copy, PartialEq )]
pub enum SeekTarget {
    /// Absolute position in the track
    At( Duration ),

    /// Fraction of the track length
    Fraction( f64 ),
}


impl FromStr for SeekTarget {
    type Err = CommandError;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_suffix( '%' ) {
            Some( pct ) => {
                let pct: f64 = pct.trim().parse()
                    .map_err( |_| CommandError::InvalidArgument( format!( "Invalid percentage: {}", s ) ) )?;
                Ok( SeekTarget::Fraction( pct / 100.0 ) )
            }
            None => parse_time( s ).map( SeekTarget::At ),
        }
    }
}


/// Parsed slash command.
#[derive( Debug, Clone, PartialEq )]
pub enum Command {
    // Playback
    Toggle,
    Next,
    Prev,
    Seek { target: SeekTarget },
    Volume { percent: u32 },

    // Albums
    Open { folder: String },
    Albums,

    // UI
    Help,
    Quit,
}


impl Command {
    /// Parses what was typed after the `/`.
    ///
    /// @param input - Command name followed by an optional argument
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let ( name, rest ) = input.trim().split_once( ' ' ).unwrap_or(( input.trim(), "" ));
        let name = name.to_lowercase();
        let args = Some( rest.trim() ).filter( |s| !s.is_empty() );

        match name.as_str() {
            "play" | "pause" | "p" => Ok( Command::Toggle ),
            "next" | "n" => Ok( Command::Next ),
            "prev" | "previous" | "b" => Ok( Command::Prev ),
            "seek" | "s" => {
                let target = args
                    .ok_or_else( || CommandError::MissingArgument( "position such as 1:30 or 25%".into() ) )?;
                Ok( Command::Seek { target: target.parse()? } )
            }
            "vol" | "volume" => {
                let level = args
                    .ok_or_else( || CommandError::MissingArgument( "volume level".into() ) )?;
                let percent: u32 = level.parse()
                    .map_err( |_| CommandError::InvalidArgument( format!( "Invalid volume: {}", level ) ) )?;
                if percent > 100 {
                    return Err( CommandError::InvalidArgument( format!( "Volume out of range: {}", percent ) ) );
                }
                Ok( Command::Volume { percent } )
            }
            "open" | "o" | "album" => {
                let folder = args
                    .ok_or_else( || CommandError::MissingArgument( "folder".into() ) )?;
                Ok( Command::Open { folder: folder.to_string() } )
            }
            "albums" | "rescan" => Ok( Command::Albums ),
            "help" | "?" => Ok( Command::Help ),
            "quit" | "q" => Ok( Command::Quit ),

            "" => Err( CommandError::MissingArgument( "command name".into() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }
}


/// Key and command reference for the help view.
pub fn help_text() -> &'static str {
    r#"Playback Commands:
  /play           Toggle play/pause      [Space]
  /next           Next track             [n]
  /prev           Previous track         [p]
  /seek <time>    Seek (1:30, 90, 25%)   [←/→]
  /vol <0-100>    Set volume             [+/-]

Album Commands:
  /open <folder>  Load and play an album [Enter]
  /albums         Rescan the songs folder

General:
  /help           This reference         [?]
  /quit           Exit albumdeck         [q]"#
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_open() {
        let cmd = Command::parse( "open Kind_of_Blue" ).unwrap();
        assert_eq!( cmd, Command::Open { folder: "Kind_of_Blue".into() } );
    }


    #[test]
    fn test_parse_seek_forms() {
        assert_eq!(
            Command::parse( "seek 1:30" ).unwrap(),
            Command::Seek { target: SeekTarget::At( Duration::from_secs( 90 ) ) }
        );
        assert_eq!(
            Command::parse( "s 25%" ).unwrap(),
            Command::Seek { target: SeekTarget::Fraction( 0.25 ) }
        );
    }


    #[test]
    fn test_parse_volume_bounds() {
        assert_eq!( Command::parse( "vol 70" ).unwrap(), Command::Volume { percent: 70 } );
        assert!( matches!( Command::parse( "vol 140" ), Err( CommandError::InvalidArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "vol" ), Err( CommandError::MissingArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_aliases() {
        assert_eq!( Command::parse( "P" ).unwrap(), Command::Toggle );
        assert_eq!( Command::parse( "previous" ).unwrap(), Command::Prev );
        assert_eq!( Command::parse( "q" ).unwrap(), Command::Quit );
    }


    #[test]
    fn test_parse_unknown() {
        assert!( matches!( Command::parse( "foobar" ), Err( CommandError::Unknown( _ ) ) ) );
        assert!( matches!( Command::parse( "  " ), Err( CommandError::MissingArgument( _ ) ) ) );
    }
}
