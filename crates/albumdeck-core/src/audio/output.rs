//! Sound device output.
//!
//! The decode thread pushes interleaved samples into a [`SampleBuffer`]; the
//! cpal callback drains it, remixing channels and applying volume.

use std::collections::VecDeque;
use std::sync::atomic::{ AtomicBool, AtomicU32, Ordering };
use std::sync::{ Arc, Mutex, MutexGuard };

use cpal::traits::{ DeviceTrait, HostTrait, StreamTrait };
use thiserror::Error;


/// Why the sound device refused a session.
#[derive( Debug, Error )]
pub enum OutputError {
    #[error( "No sound device" )]
    NoDevice,

    #[error( "Sound device offers no usable format: {0}" )]
    Format( String ),

    #[error( "Cannot open sound device: {0}" )]
    Open( String ),

    #[error( "Sound device refused to start: {0}" )]
    Start( String ),
}


/// Bounded sample queue shared by the decode thread and the output callback.
pub struct SampleBuffer {
    queue: Mutex<VecDeque<f32>>,
    capacity: usize,
    paused: AtomicBool,
    /// Volume stored as f32 bits
    volume: AtomicU32,
    source_channels: usize,
    output_channels: usize,
}


impl SampleBuffer {
    /// Creates a buffer holding at most `capacity` source samples.
    pub fn new( capacity: usize, source_channels: u16, output_channels: u16 ) -> Self {
        Self {
            queue: Mutex::new( VecDeque::with_capacity( capacity ) ),
            capacity,
            paused: AtomicBool::new( false ),
            volume: AtomicU32::new( 1.0_f32.to_bits() ),
            source_channels: source_channels.max( 1 ) as usize,
            output_channels: output_channels.max( 1 ) as usize,
        }
    }


    fn queue( &self ) -> MutexGuard<'_, VecDeque<f32>> {
        // A poisoned queue only ever holds plain samples.
        self.queue.lock().unwrap_or_else( |e| e.into_inner() )
    }


    /// Pushes as many samples as fit. Returns the number accepted.
    pub fn push( &self, samples: &[f32] ) -> usize {
        let mut queue = self.queue();
        let room = self.capacity.saturating_sub( queue.len() );
        let accepted = samples.len().min( room );
        queue.extend( samples[ ..accepted ].iter().copied() );
        accepted
    }


    /// Fills `output` with remixed, volume-scaled frames.
    ///
    /// Unfilled samples are zeroed. Returns the number of output samples
    /// written from the queue.
    pub fn pop( &self, output: &mut [f32] ) -> usize {
        if self.is_paused() {
            output.fill( 0.0 );
            return 0;
        }

        let volume = self.volume();
        let src = self.source_channels;
        let out = self.output_channels;
        let mut queue = self.queue();

        let frames = ( output.len() / out ).min( queue.len() / src );
        let mut frame = Vec::with_capacity( src );

        for f in 0..frames {
            frame.clear();
            frame.extend( queue.drain( ..src ) );

            for ( ch, slot ) in output[ f * out..( f + 1 ) * out ].iter_mut().enumerate() {
                *slot = remix( &frame, ch, out ) * volume;
            }
        }

        let written = frames * out;
        output[ written.. ].fill( 0.0 );
        written
    }


    pub fn len( &self ) -> usize {
        self.queue().len()
    }


    pub fn is_empty( &self ) -> bool {
        self.queue().is_empty()
    }


    pub fn clear( &self ) {
        self.queue().clear();
    }


    pub fn set_paused( &self, paused: bool ) {
        self.paused.store( paused, Ordering::Relaxed );
    }


    pub fn is_paused( &self ) -> bool {
        self.paused.load( Ordering::Relaxed )
    }


    /// Sets the volume level (0.0 = mute, 1.0 = normal).
    pub fn set_volume( &self, volume: f32 ) {
        self.volume.store( volume.to_bits(), Ordering::Relaxed );
    }


    pub fn volume( &self ) -> f32 {
        f32::from_bits( self.volume.load( Ordering::Relaxed ) )
    }
}


/// Maps one source frame onto output channel `ch` of `out`.
fn remix( frame: &[f32], ch: usize, out: usize ) -> f32 {
    match ( frame.len(), out ) {
        ( 1, _ ) => frame[ 0 ],
        ( n, 1 ) => frame.iter().sum::<f32>() / n as f32,
        ( n, _ ) => frame[ ch.min( n - 1 ) ],
    }
}


/// Live cpal stream for one session.
///
/// Not Send: cpal streams must stay on the thread that built them.
pub struct OutputStream {
    stream: cpal::Stream,
    sample_rate: u32,
}


impl OutputStream {
    /// Opens the default device, preferring a config at the source rate.
    ///
    /// Returns the stream and the buffer the decoder should feed.
    pub fn open(
        source_rate: u32,
        source_channels: u16,
    ) -> Result<( Self, Arc<SampleBuffer> ), OutputError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or( OutputError::NoDevice )?;

        tracing::debug!( "Using output device: {:?}", device.name() );

        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err( |e| OutputError::Format( e.to_string() ) )?
            .collect();

        let covers_rate = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate().0 <= source_rate && c.max_sample_rate().0 >= source_rate
        };

        let config = match supported
            .iter()
            .find( |c| c.channels() == source_channels && covers_rate( c ) )
            .or_else( || supported.iter().find( |c| covers_rate( c ) ) )
        {
            Some( range ) => range.clone().with_sample_rate( cpal::SampleRate( source_rate ) ).config(),
            None => {
                let fallback = device
                    .default_output_config()
                    .map_err( |e| OutputError::Format( e.to_string() ) )?;
                tracing::info!(
                    "Device does not support {} Hz, resampling to {} Hz",
                    source_rate,
                    fallback.sample_rate().0
                );
                fallback.config()
            }
        };

        // Roughly half a second of source audio.
        let capacity = source_rate as usize * source_channels as usize / 2;
        let buffer = Arc::new( SampleBuffer::new( capacity, source_channels, config.channels ) );
        let feed = Arc::clone( &buffer );

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    feed.pop( data );
                },
                |err| tracing::error!( "Audio output error: {}", err ),
                None,
            )
            .map_err( |e| OutputError::Open( e.to_string() ) )?;

        Ok(( Self { stream, sample_rate: config.sample_rate.0 }, buffer ))
    }


    pub fn play( &self ) -> Result<(), OutputError> {
        self.stream
            .play()
            .map_err( |e| OutputError::Start( e.to_string() ) )
    }


    /// Actual device sample rate.
    pub fn sample_rate( &self ) -> u32 {
        self.sample_rate
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_push_respects_capacity() {
        let buffer = SampleBuffer::new( 4, 2, 2 );
        assert_eq!( buffer.push( &[ 0.1; 6 ] ), 4 );
        assert_eq!( buffer.len(), 4 );
    }


    #[test]
    fn test_pop_mono_to_stereo() {
        let buffer = SampleBuffer::new( 16, 1, 2 );
        buffer.push( &[ 0.25, 0.5 ] );

        let mut out = [ 1.0; 6 ];
        assert_eq!( buffer.pop( &mut out ), 4 );
        assert_eq!( out, [ 0.25, 0.25, 0.5, 0.5, 0.0, 0.0 ] );
    }


    #[test]
    fn test_pop_stereo_to_mono_mixes() {
        let buffer = SampleBuffer::new( 16, 2, 1 );
        buffer.push( &[ 0.2, 0.4 ] );

        let mut out = [ 0.0; 1 ];
        buffer.pop( &mut out );
        assert!( ( out[ 0 ] - 0.3 ).abs() < 1e-6 );
    }


    #[test]
    fn test_pop_applies_volume_and_pause() {
        let buffer = SampleBuffer::new( 16, 2, 2 );
        buffer.push( &[ 0.5, 0.5, 0.5, 0.5 ] );
        buffer.set_volume( 0.5 );

        buffer.set_paused( true );
        let mut out = [ 1.0; 2 ];
        assert_eq!( buffer.pop( &mut out ), 0 );
        assert_eq!( out, [ 0.0, 0.0 ] );
        assert_eq!( buffer.len(), 4 );

        buffer.set_paused( false );
        buffer.pop( &mut out );
        assert_eq!( out, [ 0.25, 0.25 ] );
    }
}
