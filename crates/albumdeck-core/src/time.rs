//! Playback time formatting and parsing.

use std::time::Duration;

use crate::command::CommandError;


/// Formats a seconds value as zero-padded `MM:SS`.
///
/// Negative and non-finite inputs render as `00:00`. Fractional seconds are
/// truncated, never rounded.
pub fn format_time( seconds: f64 ) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }

    let minutes = ( seconds / 60.0 ).floor() as u64;
    let remaining = ( seconds % 60.0 ).floor() as u64;
    format!( "{:02}:{:02}", minutes, remaining )
}


/// Formats an optional duration, treating `None` as unknown.
pub fn format_duration( duration: Option<Duration> ) -> String {
    match duration {
        Some( d ) => format_time( d.as_secs_f64() ),
        None => format_time( f64::NAN ),
    }
}


/// Parses a time string like "1:30" or "90" into a Duration.
///
/// @param s - Time string in format "MM:SS", "M:SS", or just seconds
///
/// @returns Duration or error
pub fn parse_time( s: &str ) -> Result<Duration, CommandError> {
    let s = s.trim();

    if let Some(( min, sec )) = s.split_once( ':' ) {
        let minutes: u64 = min.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid minutes: {}", min ) ) )?;
        let seconds: u64 = sec.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid seconds: {}", sec ) ) )?;
        if seconds >= 60 {
            return Err( CommandError::InvalidArgument( format!( "Seconds out of range: {}", sec ) ) );
        }
        Ok( Duration::from_secs( minutes * 60 + seconds ) )
    } else {
        let seconds: u64 = s.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid time: {}", s ) ) )?;
        Ok( Duration::from_secs( seconds ) )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_degenerate_inputs() {
        for value in [ -1.0, -0.001, f64::NAN, f64::INFINITY, f64::NEG_INFINITY ] {
            assert_eq!( format_time( value ), "00:00", "input {}", value );
        }
    }


    #[test]
    fn test_whole_seconds_match_div_mod() {
        for s in 0..6000u64 {
            let expected = format!( "{:02}:{:02}", s / 60, s % 60 );
            assert_eq!( format_time( s as f64 ), expected );
        }
    }


    #[test]
    fn test_fraction_truncates() {
        assert_eq!( format_time( 59.999 ), "00:59" );
        assert_eq!( format_time( 61.5 ), "01:01" );
    }


    #[test]
    fn test_long_tracks_widen_minutes() {
        assert_eq!( format_time( 6000.0 ), "100:00" );
    }


    #[test]
    fn test_format_duration_unknown() {
        assert_eq!( format_duration( None ), "00:00" );
        assert_eq!( format_duration( Some( Duration::from_millis( 83_400 ) ) ), "01:23" );
    }


    #[test]
    fn test_parse_time() {
        assert_eq!( parse_time( "1:30" ).unwrap(), Duration::from_secs( 90 ) );
        assert_eq!( parse_time( " 45 " ).unwrap(), Duration::from_secs( 45 ) );
        assert!( matches!( parse_time( "1:75" ), Err( CommandError::InvalidArgument( _ ) ) ) );
        assert!( matches!( parse_time( "abc" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }
}
