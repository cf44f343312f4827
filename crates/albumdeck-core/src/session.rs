//! Media session abstraction
//!
//! A session is one bound instance of the host's playable media handle,
//! alive for a single track. The controller only ever polls the session it
//! currently owns, so events from a replaced session can never reach it.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;


/// Errors raised by a media backend or session.
#[derive( Debug, Error )]
pub enum SessionError {
    #[error( "Failed to open track: {0}" )]
    Open( String ),

    #[error( "Decode error: {0}" )]
    Decode( String ),

    #[error( "Audio output error: {0}" )]
    Output( String ),

    #[error( "Play command rejected: {0}" )]
    Rejected( String ),
}


/// Events a session reports to its owner.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum SessionEvent {
    /// The track finished naturally. Reported once.
    Ended,

    /// The media failed to load or decode mid-playback.
    Errored( String ),
}


/// A source of media sessions, one per track.
pub trait MediaBackend {
    type Session: MediaSession;

    /// Binds a new session to the track without starting it.
    fn open( &mut self, track: &Path ) -> Result<Self::Session, SessionError>;
}


/// A single track's playback handle.
pub trait MediaSession {
    /// Issues the play command. An error means the command was rejected.
    fn play( &mut self ) -> Result<(), SessionError>;

    fn pause( &mut self );

    /// Elapsed playback time.
    fn position( &self ) -> Duration;

    /// Total length, if known.
    fn duration( &self ) -> Option<Duration>;

    /// Moves playback to `position`.
    ///
    /// `Output` and `Rejected` mean the output was lost and the session
    /// waits for play. Other errors leave playback as it was.
    fn seek( &mut self, position: Duration ) -> Result<(), SessionError>;

    /// Sets the output level (0.0 = mute, 1.0 = full).
    fn set_volume( &mut self, volume: f32 );

    /// Takes the next pending event, if any.
    fn poll_event( &mut self ) -> Option<SessionEvent>;

    /// Stops playback and releases the output. The session is inert afterwards.
    fn stop( &mut self );
}
