//! Playback control
//!
//! The controller owns the playlist, the cursor, and the single active
//! media session. Starting a track always stops and drops the previous
//! session before the next one is opened, and events are only ever polled
//! from the session currently held, so a replaced track cannot steer the
//! player.

use std::path::{ Path, PathBuf };
use std::time::{ Duration, Instant };

use crate::loader::{ FolderMetadata, LoadError, LoadedFolder, PlaylistLoader };
use crate::notify::Notifier;
use crate::playlist::{ display_name, Playlist };
use crate::session::{ MediaBackend, MediaSession, SessionError, SessionEvent };
use crate::time::{ format_duration, format_time };


const MSG_SELECT_ALBUM: &str = "Please select an album first";
const MSG_NO_SONGS: &str = "No songs loaded";
const MSG_PLAY_FAILED: &str = "Playback failed. Press play to retry.";
const MSG_UNKNOWN_LENGTH: &str = "Cannot seek: track length unknown";


/// Current playback state.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum PlaybackState {
    /// No session, or a session whose play command was rejected.
    #[default]
    Idle,
    Playing,
    Paused,
}


/// Elapsed and total time of the current track.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub struct Progress {
    pub elapsed: Duration,
    pub total: Option<Duration>,
}


impl Progress {
    /// "MM:SS / MM:SS" label for the time display.
    pub fn label( &self ) -> String {
        format!( "{} / {}", format_time( self.elapsed.as_secs_f64() ), format_duration( self.total ) )
    }


    /// Seek indicator position in percent, when the length is known.
    pub fn percent( &self ) -> Option<f64> {
        let total = self.total.filter( |t| !t.is_zero() )?;
        Some( self.elapsed.as_secs_f64() / total.as_secs_f64() * 100.0 )
    }
}


/// Direction of a playlist step.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
enum Step {
    Forward,
    Backward,
}


/// Outcome of trying to start one track.
enum Start {
    Started,
    Rejected,
    OpenFailed,
}


/// Owns the playlist and the active session, and drives transport.
pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    session: Option<B::Session>,
    state: PlaybackState,
    now_playing: Option<PathBuf>,
    progress: Progress,

    folder: Option<String>,
    folder_info: Option<FolderMetadata>,
    playlist: Playlist,

    /// Last level applied to a session, carried to later sessions
    volume: Option<f32>,

    /// Consecutive unplayable tracks before auto-advance gives up.
    /// None means the playlist length.
    skip_limit: Option<usize>,
    failures: usize,

    notifier: Notifier,
}


impl<B: MediaBackend> PlaybackController<B> {
    /// Creates an idle controller with an empty playlist.
    pub fn new( backend: B, notifier: Notifier ) -> Self {
        Self {
            backend,
            session: None,
            state: PlaybackState::Idle,
            now_playing: None,
            progress: Progress::default(),
            folder: None,
            folder_info: None,
            playlist: Playlist::new(),
            volume: None,
            skip_limit: None,
            failures: 0,
            notifier,
        }
    }


    /// Caps consecutive skips over unplayable tracks.
    pub fn with_skip_limit( mut self, limit: Option<usize> ) -> Self {
        self.skip_limit = limit;
        self
    }


    /// Applies the result of a folder load.
    ///
    /// The folder always becomes current. On failure the playlist is
    /// emptied and the user is told once. The running session is left
    /// alone either way.
    ///
    /// @returns The number of tracks now in the playlist
    pub fn install_folder( &mut self, folder: &str, result: Result<LoadedFolder, LoadError> ) -> usize {
        self.failures = 0;

        match result {
            Ok( loaded ) => {
                tracing::info!( "Album '{}' ready with {} tracks", loaded.folder, loaded.playlist.len() );
                self.folder = Some( loaded.folder );
                self.folder_info = Some( loaded.info );
                self.playlist = loaded.playlist;
            }
            Err( e ) => {
                tracing::error!( "Failed to load '{}': {}", folder, e );
                self.folder = Some( folder.to_string() );
                self.folder_info = None;
                self.playlist = Playlist::new();
                self.notifier.show( e.user_message() );
            }
        }

        self.playlist.len()
    }


    /// Loads a folder and starts its first track.
    ///
    /// @returns true if playback of the first track was attempted
    pub async fn open_folder( &mut self, loader: &PlaylistLoader, folder: &str ) -> bool {
        tracing::info!( "Loading album: {}", folder );
        let result = loader.load( folder ).await;
        self.open_loaded( folder, result )
    }


    /// Installs a finished load and starts its first track.
    ///
    /// A folder that loads but lists no songs is reported like a missing one.
    ///
    /// @returns true if playback of the first track was attempted
    pub fn open_loaded( &mut self, folder: &str, result: Result<LoadedFolder, LoadError> ) -> bool {
        let failed = result.is_err();

        if self.install_folder( folder, result ) == 0 {
            tracing::warn!( "No songs loaded from {}", folder );
            if !failed {
                self.notifier.show( format!( "No songs found in {}", folder ) );
            }
            return false;
        }
        self.play_first()
    }


    /// Moves the cursor to the first track and plays it.
    pub fn play_first( &mut self ) -> bool {
        self.play_at( 0 )
    }


    /// Moves the cursor to `index` and plays that track.
    pub fn play_at( &mut self, index: usize ) -> bool {
        match self.playlist.jump_to( index ).cloned() {
            Some( track ) => {
                self.play_track( track );
                true
            }
            None => false,
        }
    }


    /// Plays a track, replacing any active session.
    ///
    /// A track that cannot be opened is reported and skipped.
    pub fn play_track( &mut self, track: PathBuf ) {
        if let Start::OpenFailed = self.start( track ) {
            if self.record_failure() {
                self.advance( Step::Forward );
            }
        }
    }


    /// Plays the next track, wrapping at the end.
    pub fn next( &mut self ) {
        self.advance( Step::Forward );
    }


    /// Plays the previous track, wrapping at the start.
    pub fn previous( &mut self ) {
        self.advance( Step::Backward );
    }


    /// Toggles between playing and paused.
    ///
    /// A session whose play command was rejected is retried. Without a
    /// session the track under the cursor is started again.
    pub fn toggle_play_pause( &mut self ) {
        if self.session.is_none() {
            match ( self.folder.is_some(), self.playlist.current().cloned() ) {
                ( false, _ ) => self.notifier.show( MSG_SELECT_ALBUM ),
                ( true, None ) => self.notifier.show( MSG_NO_SONGS ),
                ( true, Some( track ) ) => self.play_track( track ),
            }
            return;
        }
        let Some( session ) = self.session.as_mut() else {
            return;
        };

        match self.state {
            PlaybackState::Playing => {
                session.pause();
                self.state = PlaybackState::Paused;
                tracing::info!( "Paused" );
            }
            PlaybackState::Paused | PlaybackState::Idle => match session.play() {
                Ok(()) => {
                    self.state = PlaybackState::Playing;
                    tracing::info!( "Resumed" );
                }
                Err( e ) => {
                    tracing::error!( "Play failed: {}", e );
                    self.state = PlaybackState::Idle;
                    self.notifier.show( MSG_PLAY_FAILED );
                }
            },
        }
    }


    /// Seeks to a fraction of the track length.
    ///
    /// The fraction is clamped to [0, 1]; NaN is ignored.
    pub fn seek( &mut self, fraction: f64 ) {
        let Some( total ) = self.seekable_length() else {
            return;
        };
        if fraction.is_nan() {
            tracing::debug!( "Ignoring NaN seek fraction" );
            return;
        }

        let fraction = fraction.clamp( 0.0, 1.0 );
        tracing::debug!( "Seeking to {:.0}%", fraction * 100.0 );
        self.seek_within( total.mul_f64( fraction ) );
    }


    /// Seeks to an absolute position, clamped to the track length.
    pub fn seek_to( &mut self, position: Duration ) {
        if let Some( total ) = self.seekable_length() {
            self.seek_within( position.min( total ) );
        }
    }


    /// Sets the volume from a percentage (0-100).
    ///
    /// Ignored while no session exists.
    pub fn set_volume( &mut self, percent: u32 ) {
        let Some( session ) = self.session.as_mut() else {
            return;
        };

        let volume = percent.min( 100 ) as f32 / 100.0;
        session.set_volume( volume );
        self.volume = Some( volume );
        tracing::debug!( "Volume: {}%", percent.min( 100 ) );
    }


    /// Processes session events, refreshes progress, and expires notifications.
    ///
    /// Call once per UI frame.
    pub fn tick( &mut self, now: Instant ) {
        let event = self.session.as_mut().and_then( |s| s.poll_event() );

        if let Some( session ) = self.session.as_ref() {
            self.progress = Progress {
                elapsed: session.position(),
                total: session.duration(),
            };
            if self.state == PlaybackState::Playing && !self.progress.elapsed.is_zero() {
                self.failures = 0;
            }
        }

        match event {
            Some( SessionEvent::Ended ) => {
                tracing::info!( "Track ended, playing next" );
                self.failures = 0;
                self.next();
            }
            Some( SessionEvent::Errored( message ) ) => {
                tracing::error!( "Error playing {:?}: {}", self.now_playing, message );
                if self.record_failure() {
                    self.advance( Step::Forward );
                } else {
                    self.detach();
                }
            }
            None => {}
        }

        self.notifier.expire( now );
    }


    /// Shows a notification on the controller's presenter.
    pub fn notify( &mut self, message: impl Into<String> ) {
        self.notifier.show( message );
    }


    pub fn state( &self ) -> PlaybackState {
        self.state
    }


    /// Returns true while a session is held, even an idle one.
    pub fn has_session( &self ) -> bool {
        self.session.is_some()
    }


    pub fn now_playing( &self ) -> Option<&Path> {
        self.now_playing.as_deref()
    }


    /// Display name of the current track.
    pub fn now_playing_name( &self ) -> Option<String> {
        self.now_playing.as_deref().map( display_name )
    }


    pub fn progress( &self ) -> Progress {
        self.progress
    }


    pub fn folder( &self ) -> Option<&str> {
        self.folder.as_deref()
    }


    pub fn folder_info( &self ) -> Option<&FolderMetadata> {
        self.folder_info.as_ref()
    }


    pub fn playlist( &self ) -> &Playlist {
        &self.playlist
    }


    /// Last volume applied, as a fraction.
    pub fn volume( &self ) -> Option<f32> {
        self.volume
    }


    pub fn notifier( &self ) -> &Notifier {
        &self.notifier
    }


    pub fn backend( &self ) -> &B {
        &self.backend
    }


    /// Steps the cursor and plays, skipping forward past unplayable tracks.
    fn advance( &mut self, step: Step ) {
        if self.folder.is_none() {
            self.notifier.show( MSG_SELECT_ALBUM );
            return;
        }

        let mut step = step;
        loop {
            let track = match step {
                Step::Forward => self.playlist.next(),
                Step::Backward => self.playlist.previous(),
            };
            let Some( track ) = track.cloned() else {
                self.notifier.show( MSG_NO_SONGS );
                return;
            };

            tracing::debug!( "Track {}/{}", self.playlist.cursor() + 1, self.playlist.len() );

            match self.start( track ) {
                Start::Started | Start::Rejected => return,
                Start::OpenFailed => {
                    if !self.record_failure() {
                        return;
                    }
                    // Errors always skip forward.
                    step = Step::Forward;
                }
            }
        }
    }


    /// Detaches the old session, then opens and plays `track`.
    fn start( &mut self, track: PathBuf ) -> Start {
        self.detach();

        tracing::info!( "Playing: {:?}", track );
        let opened = self.backend.open( &track );
        self.progress = Progress::default();
        self.now_playing = Some( track );

        let mut session = match opened {
            Ok( session ) => session,
            Err( e ) => {
                tracing::error!( "Failed to open {:?}: {}", self.now_playing, e );
                return Start::OpenFailed;
            }
        };

        if let Some( volume ) = self.volume {
            session.set_volume( volume );
        }
        self.progress.total = session.duration();

        let played = session.play();
        self.session = Some( session );

        match played {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                let name = self.now_playing_name().unwrap_or_default();
                self.notifier.show( format!( "Now Playing: {}", name ) );
                Start::Started
            }
            Err( e ) => {
                tracing::error!( "Play failed: {}", e );
                self.state = PlaybackState::Idle;
                self.notifier.show( MSG_PLAY_FAILED );
                Start::Rejected
            }
        }
    }


    /// Counts an unplayable track and tells the user.
    ///
    /// @returns false once the skip limit is reached
    fn record_failure( &mut self ) -> bool {
        let name = self.now_playing_name().unwrap_or_default();
        self.failures += 1;

        let limit = self.skip_limit.unwrap_or( self.playlist.len() ).max( 1 );
        if self.failures >= limit {
            tracing::warn!( "Giving up after {} unplayable tracks", self.failures );
            self.notifier.show( format!(
                "Stopped after {} unplayable {}. Press n to retry.",
                self.failures,
                if self.failures == 1 { "track" } else { "tracks" }
            ));
            self.failures = 0;
            return false;
        }

        self.notifier.show( format!( "Error playing: {}", name ) );
        true
    }


    fn seekable_length( &mut self ) -> Option<Duration> {
        let Some( session ) = self.session.as_ref() else {
            self.notifier.show( MSG_SELECT_ALBUM );
            return None;
        };

        match session.duration().filter( |d| !d.is_zero() ) {
            Some( total ) => Some( total ),
            None => {
                self.notifier.show( MSG_UNKNOWN_LENGTH );
                None
            }
        }
    }


    fn seek_within( &mut self, position: Duration ) {
        let Some( session ) = self.session.as_mut() else {
            return;
        };

        match session.seek( position ) {
            Ok(()) => self.progress.elapsed = position,
            Err( e @ SessionError::Rejected( _ ) ) | Err( e @ SessionError::Output( _ ) ) => {
                // Output is gone; the session waits for play at the new position.
                tracing::error!( "Seek lost the output: {}", e );
                self.state = PlaybackState::Idle;
                self.progress.elapsed = position;
                self.notifier.show( MSG_PLAY_FAILED );
            }
            Err( e ) => {
                tracing::error!( "Seek failed: {}", e );
                self.notifier.show( format!( "Seek failed: {}", seek_reason( &e ) ) );
            }
        }
    }


    /// Stops and drops the active session.
    fn detach( &mut self ) {
        if let Some( mut session ) = self.session.take() {
            session.stop();
        }
        self.state = PlaybackState::Idle;
    }
}


fn seek_reason( error: &SessionError ) -> &'static str {
    match error {
        SessionError::Decode( _ ) => "unseekable track",
        SessionError::Open( _ ) => "track unavailable",
        SessionError::Output( _ ) | SessionError::Rejected( _ ) => "audio output error",
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::collections::{ HashSet, VecDeque };
    use std::rc::Rc;


    #[derive( Debug, Default )]
    struct FakeState {
        events: VecDeque<SessionEvent>,
        position: Duration,
        paused: bool,
        volume: f32,
        seeks: Vec<Duration>,
        seek_error: Option<SessionError>,
    }


    type Journal = Rc<RefCell<Vec<String>>>;


    #[derive( Default )]
    struct FakeBackend {
        journal: Journal,
        unplayable: HashSet<PathBuf>,
        reject_play: Rc<RefCell<bool>>,
        duration: Option<Duration>,
        sessions: Vec<( PathBuf, Rc<RefCell<FakeState>> )>,
    }


    impl FakeBackend {
        fn state_of( &self, track: &str ) -> Rc<RefCell<FakeState>> {
            let ( _, state ) = self.sessions
                .iter()
                .rev()
                .find( |( p, _ )| p == Path::new( track ) )
                .expect( "track was never opened" );
            Rc::clone( state )
        }
    }


    struct FakeSession {
        name: String,
        journal: Journal,
        reject_play: Rc<RefCell<bool>>,
        duration: Option<Duration>,
        state: Rc<RefCell<FakeState>>,
    }


    impl MediaBackend for FakeBackend {
        type Session = FakeSession;


        fn open( &mut self, track: &Path ) -> Result<FakeSession, SessionError> {
            let name = track.display().to_string();
            self.journal.borrow_mut().push( format!( "open {}", name ) );
            if self.unplayable.contains( track ) {
                return Err( SessionError::Open( "no such file".into() ) );
            }

            let state = Rc::new( RefCell::new( FakeState { volume: 1.0, ..Default::default() } ) );
            self.sessions.push(( track.to_path_buf(), Rc::clone( &state ) ));
            Ok( FakeSession {
                name,
                journal: Rc::clone( &self.journal ),
                reject_play: Rc::clone( &self.reject_play ),
                duration: self.duration,
                state,
            })
        }
    }


    impl MediaSession for FakeSession {
        fn play( &mut self ) -> Result<(), SessionError> {
            self.journal.borrow_mut().push( format!( "play {}", self.name ) );
            if *self.reject_play.borrow() {
                return Err( SessionError::Rejected( "not allowed".into() ) );
            }
            self.state.borrow_mut().paused = false;
            Ok(())
        }

        fn pause( &mut self ) {
            self.state.borrow_mut().paused = true;
        }

        fn position( &self ) -> Duration {
            self.state.borrow().position
        }

        fn duration( &self ) -> Option<Duration> {
            self.duration
        }

        fn seek( &mut self, position: Duration ) -> Result<(), SessionError> {
            let mut state = self.state.borrow_mut();
            if let Some( error ) = state.seek_error.take() {
                return Err( error );
            }
            state.seeks.push( position );
            Ok(())
        }

        fn set_volume( &mut self, volume: f32 ) {
            self.state.borrow_mut().volume = volume;
        }

        fn poll_event( &mut self ) -> Option<SessionEvent> {
            self.state.borrow_mut().events.pop_front()
        }

        fn stop( &mut self ) {
            self.journal.borrow_mut().push( format!( "stop {}", self.name ) );
        }
    }


    fn loaded( folder: &str, songs: &[&str] ) -> Result<LoadedFolder, LoadError> {
        Ok( LoadedFolder {
            folder: folder.to_string(),
            info: FolderMetadata::default(),
            playlist: Playlist::from_tracks( songs.iter().map( PathBuf::from ).collect() ),
        })
    }


    fn controller( backend: FakeBackend ) -> PlaybackController<FakeBackend> {
        PlaybackController::new( backend, Notifier::default() )
    }


    fn journal( ctl: &PlaybackController<FakeBackend> ) -> Vec<String> {
        ctl.backend().journal.borrow().clone()
    }


    #[test]
    fn test_switch_stops_old_session_before_opening_new() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b" ] ) );

        ctl.play_track( PathBuf::from( "a" ) );
        ctl.play_track( PathBuf::from( "b" ) );

        assert_eq!( journal( &ctl ), [ "open a", "play a", "stop a", "open b", "play b" ] );
        assert_eq!( ctl.now_playing(), Some( Path::new( "b" ) ) );
        assert_eq!( ctl.state(), PlaybackState::Playing );
    }


    #[test]
    fn test_stale_session_events_are_ignored() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b", "c" ] ) );
        ctl.play_first();
        let stale = ctl.backend().state_of( "a" );
        ctl.next();

        stale.borrow_mut().events.push_back( SessionEvent::Ended );
        stale.borrow_mut().events.push_back( SessionEvent::Errored( "late".into() ) );
        let before = journal( &ctl ).len();
        ctl.tick( Instant::now() );

        assert_eq!( journal( &ctl ).len(), before );
        assert_eq!( ctl.playlist().cursor(), 1 );
    }


    #[test]
    fn test_next_on_empty_playlist_notifies_once() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "empty", loaded( "empty", &[] ) );
        let shown = ctl.notifier().shown_count();

        ctl.next();
        assert_eq!( ctl.notifier().shown_count(), shown + 1 );
        assert_eq!( ctl.notifier().current(), Some( MSG_NO_SONGS ) );

        ctl.previous();
        assert_eq!( ctl.notifier().shown_count(), shown + 2 );
        assert_eq!( ctl.playlist().cursor(), 0 );
        assert!( journal( &ctl ).is_empty() );
    }


    #[test]
    fn test_transport_without_album_asks_for_selection() {
        let mut ctl = controller( FakeBackend::default() );

        ctl.next();
        ctl.toggle_play_pause();
        ctl.seek( 0.5 );

        assert_eq!( ctl.notifier().shown_count(), 3 );
        assert_eq!( ctl.notifier().current(), Some( MSG_SELECT_ALBUM ) );
        assert!( journal( &ctl ).is_empty() );
    }


    #[test]
    fn test_failed_load_empties_playlist_without_touching_playback() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b" ] ) );
        ctl.play_first();
        let shown = ctl.notifier().shown_count();

        let count = ctl.install_folder( "ghost", Err( LoadError::NotFound { folder: "ghost".into() } ) );

        assert_eq!( count, 0 );
        assert!( ctl.playlist().is_empty() );
        assert_eq!( ctl.folder(), Some( "ghost" ) );
        assert_eq!( ctl.notifier().shown_count(), shown + 1 );
        assert_eq!( ctl.notifier().current(), Some( "No songs found in ghost" ) );
        assert_eq!( journal( &ctl ), [ "open a", "play a" ] );
        assert_eq!( ctl.state(), PlaybackState::Playing );
    }


    #[test]
    fn test_ended_advances_with_wraparound() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b" ] ) );
        ctl.play_first();

        ctl.backend().state_of( "a" ).borrow_mut().events.push_back( SessionEvent::Ended );
        ctl.tick( Instant::now() );
        assert_eq!( ctl.now_playing(), Some( Path::new( "b" ) ) );

        ctl.backend().state_of( "b" ).borrow_mut().events.push_back( SessionEvent::Ended );
        ctl.tick( Instant::now() );
        assert_eq!( ctl.now_playing(), Some( Path::new( "a" ) ) );
        assert_eq!( ctl.playlist().cursor(), 0 );
    }


    #[test]
    fn test_error_event_notifies_and_skips() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "demo", loaded( "demo", &[ "songs/demo/a.mp3", "songs/demo/b.mp3", "songs/demo/c.mp3" ] ) );
        ctl.play_first();
        ctl.next();

        ctl.backend().state_of( "songs/demo/b.mp3" ).borrow_mut()
            .events.push_back( SessionEvent::Errored( "corrupt".into() ) );
        let shown = ctl.notifier().shown_count();
        ctl.tick( Instant::now() );

        assert_eq!( ctl.now_playing(), Some( Path::new( "songs/demo/c.mp3" ) ) );
        // "Error playing: b" then "Now Playing: c".
        assert_eq!( ctl.notifier().shown_count(), shown + 2 );
        assert_eq!( ctl.notifier().current(), Some( "Now Playing: c" ) );
    }


    #[test]
    fn test_unplayable_folder_stops_after_limit() {
        let backend = FakeBackend {
            unplayable: [ "a", "b", "c" ].iter().map( PathBuf::from ).collect(),
            ..Default::default()
        };
        let mut ctl = controller( backend );
        ctl.install_folder( "broken", loaded( "broken", &[ "a", "b", "c" ] ) );

        ctl.play_first();

        assert_eq!( journal( &ctl ), [ "open a", "open b", "open c" ] );
        assert_eq!( ctl.state(), PlaybackState::Idle );
        assert_eq!( ctl.notifier().current(), Some( "Stopped after 3 unplayable tracks. Press n to retry." ) );
    }


    #[test]
    fn test_toggle_after_giving_up_retries_current_track() {
        let backend = FakeBackend {
            unplayable: [ "a" ].iter().map( PathBuf::from ).collect(),
            ..Default::default()
        };
        let mut ctl = controller( backend ).with_skip_limit( Some( 1 ) );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b" ] ) );

        ctl.play_first();
        assert!( !ctl.has_session() );
        assert_eq!( ctl.notifier().current(), Some( "Stopped after 1 unplayable track. Press n to retry." ) );

        ctl.backend.unplayable.clear();
        ctl.toggle_play_pause();
        assert_eq!( ctl.state(), PlaybackState::Playing );
        assert_eq!( ctl.now_playing(), Some( Path::new( "a" ) ) );
        assert_eq!( journal( &ctl ), [ "open a", "open a", "play a" ] );
    }


    #[test]
    fn test_explicit_skip_limit() {
        let backend = FakeBackend {
            unplayable: [ "a", "b", "c", "d" ].iter().map( PathBuf::from ).collect(),
            ..Default::default()
        };
        let mut ctl = controller( backend ).with_skip_limit( Some( 2 ) );
        ctl.install_folder( "broken", loaded( "broken", &[ "a", "b", "c", "d" ] ) );

        ctl.play_first();
        assert_eq!( journal( &ctl ), [ "open a", "open b" ] );
    }


    #[test]
    fn test_rejected_play_stays_idle_and_toggle_retries() {
        let backend = FakeBackend::default();
        let reject = Rc::clone( &backend.reject_play );
        *reject.borrow_mut() = true;

        let mut ctl = controller( backend );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b" ] ) );
        ctl.play_first();

        assert_eq!( ctl.state(), PlaybackState::Idle );
        assert_eq!( ctl.playlist().cursor(), 0 );
        assert!( ctl.has_session() );
        assert_eq!( ctl.notifier().current(), Some( MSG_PLAY_FAILED ) );

        *reject.borrow_mut() = false;
        ctl.toggle_play_pause();
        assert_eq!( ctl.state(), PlaybackState::Playing );
        assert_eq!( journal( &ctl ), [ "open a", "play a", "play a" ] );
    }


    #[test]
    fn test_play_at_moves_cursor() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b", "c" ] ) );

        assert!( ctl.play_at( 2 ) );
        assert_eq!( ctl.playlist().cursor(), 2 );
        assert_eq!( ctl.now_playing(), Some( Path::new( "c" ) ) );
        assert!( !ctl.play_at( 3 ) );
        assert_eq!( ctl.playlist().cursor(), 2 );
    }


    #[test]
    fn test_toggle_pauses_and_resumes() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "demo", loaded( "demo", &[ "a" ] ) );
        ctl.play_first();

        ctl.toggle_play_pause();
        assert_eq!( ctl.state(), PlaybackState::Paused );
        assert!( ctl.backend().state_of( "a" ).borrow().paused );

        ctl.toggle_play_pause();
        assert_eq!( ctl.state(), PlaybackState::Playing );
    }


    #[test]
    fn test_seek_without_length_is_noop() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "demo", loaded( "demo", &[ "a" ] ) );
        ctl.play_first();

        ctl.seek( 0.5 );

        assert!( ctl.backend().state_of( "a" ).borrow().seeks.is_empty() );
        assert_eq!( ctl.notifier().current(), Some( MSG_UNKNOWN_LENGTH ) );
    }


    #[test]
    fn test_seek_scales_and_clamps_fraction() {
        let backend = FakeBackend {
            duration: Some( Duration::from_secs( 200 ) ),
            ..Default::default()
        };
        let mut ctl = controller( backend );
        ctl.install_folder( "demo", loaded( "demo", &[ "a" ] ) );
        ctl.play_first();

        ctl.seek( 0.25 );
        ctl.seek( 1.5 );
        ctl.seek( -0.2 );
        ctl.seek( f64::NAN );
        ctl.seek_to( Duration::from_secs( 500 ) );

        let seeks = ctl.backend().state_of( "a" ).borrow().seeks.clone();
        assert_eq!( seeks, [
            Duration::from_secs( 50 ),
            Duration::from_secs( 200 ),
            Duration::ZERO,
            Duration::from_secs( 200 ),
        ]);
    }


    #[test]
    fn test_seek_losing_output_goes_idle_until_play() {
        let backend = FakeBackend {
            duration: Some( Duration::from_secs( 100 ) ),
            ..Default::default()
        };
        let mut ctl = controller( backend );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b" ] ) );
        ctl.play_first();

        ctl.backend().state_of( "a" ).borrow_mut().seek_error = Some( SessionError::Rejected( "device lost".into() ) );
        ctl.seek( 0.5 );

        assert_eq!( ctl.state(), PlaybackState::Idle );
        assert_eq!( ctl.notifier().current(), Some( MSG_PLAY_FAILED ) );
        ctl.tick( Instant::now() );
        assert_eq!( ctl.now_playing(), Some( Path::new( "a" ) ) );

        ctl.toggle_play_pause();
        assert_eq!( ctl.state(), PlaybackState::Playing );
        assert_eq!( journal( &ctl ), [ "open a", "play a", "play a" ] );
    }


    #[test]
    fn test_unseekable_track_keeps_playing_and_advances() {
        let backend = FakeBackend {
            duration: Some( Duration::from_secs( 100 ) ),
            ..Default::default()
        };
        let mut ctl = controller( backend );
        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b" ] ) );
        ctl.play_first();

        let a = ctl.backend().state_of( "a" );
        a.borrow_mut().seek_error = Some( SessionError::Decode( "no index".into() ) );
        ctl.seek( 0.5 );

        assert_eq!( ctl.state(), PlaybackState::Playing );
        assert_eq!( ctl.notifier().current(), Some( "Seek failed: unseekable track" ) );

        a.borrow_mut().events.push_back( SessionEvent::Ended );
        ctl.tick( Instant::now() );
        assert_eq!( ctl.now_playing(), Some( Path::new( "b" ) ) );
    }


    #[test]
    fn test_volume_requires_session_and_carries_over() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.set_volume( 40 );
        assert_eq!( ctl.volume(), None );

        ctl.install_folder( "demo", loaded( "demo", &[ "a", "b" ] ) );
        ctl.play_first();
        ctl.set_volume( 40 );
        assert_eq!( ctl.backend().state_of( "a" ).borrow().volume, 0.4 );

        ctl.next();
        assert_eq!( ctl.backend().state_of( "b" ).borrow().volume, 0.4 );

        ctl.set_volume( 250 );
        assert_eq!( ctl.volume(), Some( 1.0 ) );
    }


    #[test]
    fn test_progress_tracks_session() {
        let backend = FakeBackend {
            duration: Some( Duration::from_secs( 120 ) ),
            ..Default::default()
        };
        let mut ctl = controller( backend );
        ctl.install_folder( "demo", loaded( "demo", &[ "a" ] ) );
        ctl.play_first();

        ctl.backend().state_of( "a" ).borrow_mut().position = Duration::from_secs( 30 );
        ctl.tick( Instant::now() );

        let progress = ctl.progress();
        assert_eq!( progress.label(), "00:30 / 02:00" );
        assert_eq!( progress.percent(), Some( 25.0 ) );
        assert_eq!( Progress::default().percent(), None );
    }


    #[test]
    fn test_now_playing_notification_uses_display_name() {
        let mut ctl = controller( FakeBackend::default() );
        ctl.install_folder( "jazz", loaded( "jazz", &[ "songs/jazz/So What.mp3" ] ) );
        ctl.play_first();
        assert_eq!( ctl.notifier().current(), Some( "Now Playing: So What" ) );
    }


    #[tokio::test]
    async fn test_open_folder_loads_then_plays_first() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join( "jazz" );
        std::fs::create_dir_all( &dir ).unwrap();
        std::fs::write( dir.join( "info.json" ), r#"{"title": "Jazz", "songs": ["a.mp3", "b.mp3"]}"# ).unwrap();

        let loader = PlaylistLoader::new( root.path() );
        let mut ctl = controller( FakeBackend::default() );

        assert!( ctl.open_folder( &loader, "jazz" ).await );
        assert_eq!( ctl.playlist().tracks(), &[ dir.join( "a.mp3" ), dir.join( "b.mp3" ) ] );
        assert_eq!( ctl.now_playing(), Some( dir.join( "a.mp3" ).as_path() ) );
        assert_eq!( ctl.folder_info().and_then( |i| i.title.as_deref() ), Some( "Jazz" ) );
    }


    #[tokio::test]
    async fn test_open_folder_without_songs_notifies_once() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join( "empty" );
        std::fs::create_dir_all( &dir ).unwrap();
        std::fs::write( dir.join( "info.json" ), r#"{"songs": []}"# ).unwrap();

        let loader = PlaylistLoader::new( root.path() );
        let mut ctl = controller( FakeBackend::default() );

        assert!( !ctl.open_folder( &loader, "empty" ).await );
        assert_eq!( ctl.notifier().shown_count(), 1 );
        assert_eq!( ctl.notifier().current(), Some( "No songs found in empty" ) );
        assert!( journal( &ctl ).is_empty() );
    }


    #[test]
    fn test_open_loaded_plays_first_track() {
        let mut ctl = controller( FakeBackend::default() );

        assert!( ctl.open_loaded( "demo", loaded( "demo", &[ "a", "b" ] ) ) );
        assert_eq!( journal( &ctl ), [ "open a", "play a" ] );
        assert_eq!( ctl.notifier().shown_count(), 1 );
    }


    #[tokio::test]
    async fn test_open_missing_folder_never_plays() {
        let root = tempfile::tempdir().unwrap();
        let loader = PlaylistLoader::new( root.path() );
        let mut ctl = controller( FakeBackend::default() );

        assert!( !ctl.open_folder( &loader, "nowhere" ).await );
        assert_eq!( ctl.notifier().shown_count(), 1 );
        assert!( journal( &ctl ).is_empty() );
    }
}
