//! Host media backend built on Symphonia and cpal.
//!
//! Each [`AudioSession`] owns one decoder and, once played, one output
//! stream with its decode thread. Dropping or stopping the session tears
//! both down before returning.

mod decoder;
mod engine;
mod output;

use std::path::{ Path, PathBuf };
use std::sync::atomic::Ordering;
use std::time::Duration;

pub use decoder::{ DecoderError, TrackDecoder };
pub use output::{ OutputError, SampleBuffer };

use engine::RunningStream;

use crate::session::{ MediaBackend, MediaSession, SessionError, SessionEvent };


/// Backend that plays local files on the default output device.
#[derive( Debug, Default )]
pub struct AudioBackend;


impl AudioBackend {
    pub fn new() -> Self {
        Self
    }
}


impl MediaBackend for AudioBackend {
    type Session = AudioSession;


    fn open( &mut self, track: &Path ) -> Result<AudioSession, SessionError> {
        let decoder = TrackDecoder::open( track )
            .map_err( |e| SessionError::Open( e.to_string() ) )?;

        Ok( AudioSession {
            path: track.to_path_buf(),
            duration: decoder.duration(),
            pending: Some( decoder ),
            offset: Duration::ZERO,
            stream: None,
            volume: 1.0,
            ended_reported: false,
        })
    }
}


/// One track bound to the audio device.
pub struct AudioSession {
    path: PathBuf,
    duration: Option<Duration>,
    /// Decoder waiting for the play command
    pending: Option<TrackDecoder>,
    /// Position the pending decoder is parked at
    offset: Duration,
    stream: Option<RunningStream>,
    volume: f32,
    ended_reported: bool,
}


impl AudioSession {
    fn take_decoder( &mut self ) -> Result<TrackDecoder, SessionError> {
        match self.pending.take() {
            Some( decoder ) => Ok( decoder ),
            None => TrackDecoder::open( &self.path )
                .map_err( |e| SessionError::Open( e.to_string() ) ),
        }
    }


    fn start( &mut self, paused: bool ) -> Result<(), SessionError> {
        let decoder = self.take_decoder()?;
        let stream = RunningStream::start( decoder, self.offset, self.volume, paused )?;
        self.stream = Some( stream );
        Ok(())
    }
}


impl MediaSession for AudioSession {
    fn play( &mut self ) -> Result<(), SessionError> {
        match self.stream.as_ref() {
            Some( stream ) => {
                stream.buffer.set_paused( false );
                Ok(())
            }
            None => self.start( false ),
        }
    }


    fn pause( &mut self ) {
        if let Some( stream ) = self.stream.as_ref() {
            stream.buffer.set_paused( true );
        }
    }


    fn position( &self ) -> Duration {
        self.stream.as_ref().map_or( self.offset, RunningStream::position )
    }


    fn duration( &self ) -> Option<Duration> {
        self.duration
    }


    fn seek( &mut self, position: Duration ) -> Result<(), SessionError> {
        tracing::info!( "Seeking to {:?} in {:?}", position, self.path );

        // The running stream survives a failed reopen or seek.
        let mut decoder = self.take_decoder()?;
        decoder.seek( position ).map_err( |e| SessionError::Decode( e.to_string() ) )?;

        let resume = self.stream.take().map( |mut stream| {
            let paused = stream.buffer.is_paused();
            stream.shutdown();
            paused
        });

        self.pending = Some( decoder );
        self.offset = position;
        self.ended_reported = false;

        match resume {
            Some( paused ) => self.start( paused ),
            None => Ok(()),
        }
    }


    fn set_volume( &mut self, volume: f32 ) {
        self.volume = volume;
        if let Some( stream ) = self.stream.as_ref() {
            stream.buffer.set_volume( volume );
        }
    }


    fn poll_event( &mut self ) -> Option<SessionEvent> {
        let stream = self.stream.as_ref()?;

        if let Some( message ) = stream.signals.take_failure() {
            return Some( SessionEvent::Errored( message ) );
        }

        if !self.ended_reported && stream.signals.ended.load( Ordering::Relaxed ) {
            self.ended_reported = true;
            return Some( SessionEvent::Ended );
        }

        None
    }


    fn stop( &mut self ) {
        if let Some( mut stream ) = self.stream.take() {
            stream.shutdown();
            tracing::debug!( "Stopped {:?}", self.path );
        }
        self.pending = None;
    }
}


impl Drop for AudioSession {
    fn drop( &mut self ) {
        self.stop();
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = AudioBackend::new().open( &dir.path().join( "missing.mp3" ) );
        assert!( matches!( result, Err( SessionError::Open( _ ) ) ) );
    }


    #[test]
    fn test_open_garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "noise.mp3" );
        std::fs::write( &path, b"definitely not audio" ).unwrap();

        match AudioBackend::new().open( &path ) {
            Err( SessionError::Open( msg ) ) => assert!( msg.contains( "Unsupported" ), "{}", msg ),
            Err( other ) => panic!( "unexpected error: {}", other ),
            Ok( _ ) => panic!( "garbage should not open" ),
        }
    }
}
