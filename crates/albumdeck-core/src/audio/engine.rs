//! Decode thread feeding an output stream.

use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::{ Arc, Mutex };
use std::thread::{ self, JoinHandle };
use std::time::Duration;

use rubato::{ FastFixedOut, PolynomialDegree, Resampler };

use super::decoder::TrackDecoder;
use super::output::{ OutputStream, SampleBuffer };
use crate::session::SessionError;


/// Output chunk size handed to the resampler.
const RESAMPLE_CHUNK: usize = 1024;


/// Flags shared between a running decode thread and its session.
#[derive( Debug, Default )]
pub struct StreamSignals {
    pub stop: AtomicBool,
    pub ended: AtomicBool,
    pub failure: Mutex<Option<String>>,
    /// Source frames decoded so far, including any seek offset
    pub frames: AtomicU64,
}


impl StreamSignals {
    /// Takes a pending failure message, if the thread reported one.
    pub fn take_failure( &self ) -> Option<String> {
        self.failure.lock().unwrap_or_else( |e| e.into_inner() ).take()
    }


    fn fail( &self, message: String ) {
        *self.failure.lock().unwrap_or_else( |e| e.into_inner() ) = Some( message );
    }
}


/// A started output stream and the thread decoding into it.
pub struct RunningStream {
    _output: OutputStream,
    pub buffer: Arc<SampleBuffer>,
    pub signals: Arc<StreamSignals>,
    pub source_rate: u32,
    thread: Option<JoinHandle<()>>,
}


impl RunningStream {
    /// Builds the output, spawns the decode thread, and starts the stream.
    ///
    /// `offset` is where `decoder` is positioned; `paused` starts the
    /// buffer silent.
    pub fn start(
        decoder: TrackDecoder,
        offset: Duration,
        volume: f32,
        paused: bool,
    ) -> Result<Self, SessionError> {
        let source_rate = decoder.sample_rate();
        let channels = decoder.channels() as u16;

        let ( output, buffer ) = OutputStream::open( source_rate, channels )
            .map_err( |e| SessionError::Rejected( e.to_string() ) )?;
        buffer.set_volume( volume );
        buffer.set_paused( paused );

        let resampler = if output.sample_rate() != source_rate {
            tracing::info!( "Resampling: {} Hz → {} Hz", source_rate, output.sample_rate() );
            let resampler = FastFixedOut::<f32>::new(
                output.sample_rate() as f64 / source_rate as f64,
                2.0,
                PolynomialDegree::Cubic,
                RESAMPLE_CHUNK,
                channels as usize,
            ).map_err( |e| SessionError::Output( format!( "Failed to create resampler: {}", e ) ) )?;
            Some( resampler )
        } else {
            None
        };

        let signals = Arc::new( StreamSignals::default() );
        signals.frames.store(
            ( offset.as_secs_f64() * source_rate as f64 ) as u64,
            Ordering::Relaxed,
        );

        output.play().map_err( |e| SessionError::Rejected( e.to_string() ) )?;

        let thread = {
            let buffer = Arc::clone( &buffer );
            let signals = Arc::clone( &signals );
            thread::Builder::new()
                .name( "albumdeck-decode".into() )
                .spawn( move || decode_loop( decoder, resampler, buffer, signals ) )
                .map_err( |e| SessionError::Output( e.to_string() ) )?
        };

        Ok( Self {
            _output: output,
            buffer,
            signals,
            source_rate,
            thread: Some( thread ),
        })
    }


    /// Elapsed time derived from decoded frames.
    pub fn position( &self ) -> Duration {
        let frames = self.signals.frames.load( Ordering::Relaxed );
        Duration::from_secs_f64( frames as f64 / self.source_rate as f64 )
    }


    /// Signals the decode thread and waits for it to exit.
    pub fn shutdown( &mut self ) {
        self.signals.stop.store( true, Ordering::Relaxed );
        self.buffer.clear();
        if let Some( thread ) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!( "Decode thread panicked" );
            }
        }
    }
}


impl Drop for RunningStream {
    fn drop( &mut self ) {
        self.shutdown();
    }
}


/// Accumulates planar input until the resampler has a full chunk.
struct ResampleQueue {
    resampler: FastFixedOut<f32>,
    pending: Vec<Vec<f32>>,
}


impl ResampleQueue {
    fn new( resampler: FastFixedOut<f32>, channels: usize ) -> Self {
        Self {
            resampler,
            pending: vec![ Vec::new(); channels ],
        }
    }


    /// Feeds interleaved samples, returning whatever full chunks produced.
    fn feed( &mut self, interleaved: &[f32] ) -> Vec<f32> {
        let channels = self.pending.len();
        for frame in interleaved.chunks( channels ) {
            for ( ch, sample ) in frame.iter().enumerate() {
                self.pending[ ch ].push( *sample );
            }
        }

        let mut out = Vec::new();
        while self.pending[ 0 ].len() >= self.resampler.input_frames_next() {
            let needed = self.resampler.input_frames_next();
            let chunk: Vec<Vec<f32>> = self.pending
                .iter_mut()
                .map( |ch| ch.drain( ..needed ).collect() )
                .collect();

            match self.resampler.process( &chunk, None ) {
                Ok( planar ) => out.extend( interleave( &planar ) ),
                Err( e ) => {
                    tracing::error!( "Resample error: {}", e );
                    break;
                }
            }
        }
        out
    }


    /// Flushes the partial tail at end of stream.
    fn finish( &mut self ) -> Vec<f32> {
        if self.pending[ 0 ].is_empty() {
            return Vec::new();
        }
        match self.resampler.process_partial( Some( self.pending.as_slice() ), None ) {
            Ok( planar ) => interleave( &planar ),
            Err( e ) => {
                tracing::error!( "Final resample error: {}", e );
                Vec::new()
            }
        }
    }
}


/// [[L0, L1, ...], [R0, R1, ...]] → [L0, R0, L1, R1, ...]
fn interleave( channels: &[Vec<f32>] ) -> Vec<f32> {
    let frames = channels.first().map_or( 0, Vec::len );
    let mut out = Vec::with_capacity( frames * channels.len() );
    for f in 0..frames {
        out.extend( channels.iter().map( |ch| ch[ f ] ) );
    }
    out
}


/// Pushes everything into the buffer, waiting while it is full.
fn push_all( buffer: &SampleBuffer, signals: &StreamSignals, samples: &[f32] ) {
    let mut offset = 0;
    while offset < samples.len() && !signals.stop.load( Ordering::Relaxed ) {
        let pushed = buffer.push( &samples[ offset.. ] );
        offset += pushed;
        if pushed == 0 {
            thread::sleep( Duration::from_millis( 5 ) );
        }
    }
}


fn decode_loop(
    mut decoder: TrackDecoder,
    resampler: Option<FastFixedOut<f32>>,
    buffer: Arc<SampleBuffer>,
    signals: Arc<StreamSignals>,
) {
    let channels = decoder.channels();
    let mut resampler = resampler.map( |r| ResampleQueue::new( r, channels ) );
    // Keep about 50ms decoded ahead of the device.
    let high_water = decoder.sample_rate() as usize * channels / 20;

    loop {
        if signals.stop.load( Ordering::Relaxed ) {
            tracing::debug!( "Decode loop: stop requested" );
            break;
        }

        if buffer.is_paused() || buffer.len() > high_water {
            thread::sleep( Duration::from_millis( 5 ) );
            continue;
        }

        match decoder.decode_next() {
            Ok( Some( samples ) ) => {
                signals.frames.fetch_add( ( samples.len() / channels ) as u64, Ordering::Relaxed );
                let ready = match resampler.as_mut() {
                    Some( queue ) => queue.feed( &samples ),
                    None => samples,
                };
                push_all( &buffer, &signals, &ready );
            }
            Ok( None ) => {
                if let Some( queue ) = resampler.as_mut() {
                    let tail = queue.finish();
                    push_all( &buffer, &signals, &tail );
                }

                while !buffer.is_empty() && !signals.stop.load( Ordering::Relaxed ) {
                    thread::sleep( Duration::from_millis( 10 ) );
                }
                if !signals.stop.load( Ordering::Relaxed ) {
                    tracing::info!( "Track reached end of stream" );
                    signals.ended.store( true, Ordering::Relaxed );
                }
                break;
            }
            Err( e ) => {
                tracing::error!( "Decode error: {}", e );
                signals.fail( e.to_string() );
                break;
            }
        }
    }

    tracing::debug!( "Decode loop: exiting" );
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_interleave() {
        let planar = vec![ vec![ 1.0, 2.0 ], vec![ 3.0, 4.0 ] ];
        assert_eq!( interleave( &planar ), vec![ 1.0, 3.0, 2.0, 4.0 ] );
        assert!( interleave( &[] ).is_empty() );
    }


    #[test]
    fn test_failure_is_taken_once() {
        let signals = StreamSignals::default();
        signals.fail( "bad packet".into() );
        assert_eq!( signals.take_failure().as_deref(), Some( "bad packet" ) );
        assert!( signals.take_failure().is_none() );
    }
}
