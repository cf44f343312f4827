//! Track decoding via Symphonia.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{ Decoder as SymphoniaDecoder, DecoderOptions, CODEC_TYPE_NULL };
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{ FormatOptions, FormatReader, SeekMode, SeekTo };
use symphonia::core::io::{ MediaSourceStream, MediaSourceStreamOptions };
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use thiserror::Error;


/// Read-ahead buffer for the media source stream.
const SOURCE_BUFFER_LEN: usize = 64 * 1024;


/// Why a track could not be opened or read.
#[derive( Debug, Error )]
pub enum DecoderError {
    #[error( "Cannot read track: {0}" )]
    Read( #[from] std::io::Error ),

    #[error( "Unsupported audio format" )]
    Unrecognized,

    #[error( "Track holds no audio stream" )]
    NoStream,

    #[error( "No codec for track: {0}" )]
    Codec( String ),

    #[error( "Corrupt audio data: {0}" )]
    Corrupt( String ),

    #[error( "Cannot seek track: {0}" )]
    Seek( String ),
}


/// Packet-by-packet decoder producing interleaved f32 samples.
pub struct TrackDecoder {
    reader: Box<dyn FormatReader>,
    codec: Box<dyn SymphoniaDecoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    duration: Option<Duration>,
    scratch: Option<SampleBuffer<f32>>,
}


impl TrackDecoder {
    /// Probes and opens a track for decoding.
    pub fn open( path: &Path ) -> Result<Self, DecoderError> {
        let file = File::open( path )?;
        let stream = MediaSourceStream::new(
            Box::new( file ),
            MediaSourceStreamOptions { buffer_len: SOURCE_BUFFER_LEN },
        );

        let mut hint = Hint::new();
        if let Some( ext ) = path.extension().and_then( |e| e.to_str() ) {
            hint.with_extension( ext );
        }

        let probed = symphonia::default::get_probe()
            .format( &hint, stream, &FormatOptions::default(), &MetadataOptions::default() )
            .map_err( |_| DecoderError::Unrecognized )?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find( |t| t.codec_params.codec != CODEC_TYPE_NULL )
            .ok_or( DecoderError::NoStream )?;

        let params = &track.codec_params;
        let track_id = track.id;
        let sample_rate = params.sample_rate.unwrap_or( 44100 );
        let channels = params.channels.map( |c| c.count() ).unwrap_or( 2 );
        let duration = params.n_frames
            .map( |frames| Duration::from_secs_f64( frames as f64 / sample_rate as f64 ) );

        let codec = symphonia::default::get_codecs()
            .make( params, &DecoderOptions::default() )
            .map_err( |e| DecoderError::Codec( e.to_string() ) )?;

        tracing::debug!(
            "Opened {:?}: {} Hz, {} channels, duration {:?}",
            path,
            sample_rate,
            channels,
            duration
        );

        Ok( Self {
            reader,
            codec,
            track_id,
            sample_rate,
            channels,
            duration,
            scratch: None,
        })
    }


    pub fn sample_rate( &self ) -> u32 {
        self.sample_rate
    }


    pub fn channels( &self ) -> usize {
        self.channels
    }


    /// Total length, when the container declares a frame count.
    pub fn duration( &self ) -> Option<Duration> {
        self.duration
    }


    /// Decodes the next packet of our track.
    ///
    /// Returns None at end of stream. Corrupt packets are skipped.
    pub fn decode_next( &mut self ) -> Result<Option<Vec<f32>>, DecoderError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok( packet ) => packet,
                Err( SymphoniaError::IoError( ref e ) )
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok( None );
                }
                Err( e ) => return Err( DecoderError::Corrupt( e.to_string() ) ),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.codec.decode( &packet ) {
                Ok( decoded ) => decoded,
                Err( SymphoniaError::DecodeError( msg ) ) => {
                    tracing::debug!( "Skipping corrupt packet: {}", msg );
                    continue;
                }
                Err( e ) => return Err( DecoderError::Corrupt( e.to_string() ) ),
            };

            let frames = decoded.frames();
            let spec = *decoded.spec();
            if self.scratch.as_ref().is_some_and( |buf| buf.capacity() < frames ) {
                self.scratch = None;
            }
            let scratch = self.scratch
                .get_or_insert_with( || SampleBuffer::new( frames as u64, spec ) );
            scratch.copy_interleaved_ref( decoded );

            return Ok( Some( scratch.samples().to_vec() ) );
        }
    }


    /// Seeks to an absolute position.
    pub fn seek( &mut self, position: Duration ) -> Result<(), DecoderError> {
        let seek_to = SeekTo::Time {
            time: Time::from( position.as_secs_f64() ),
            track_id: Some( self.track_id ),
        };

        self.reader
            .seek( SeekMode::Accurate, seek_to )
            .map_err( |e| DecoderError::Seek( e.to_string() ) )?;
        self.codec.reset();

        Ok(())
    }
}
