//! Transient status notifications.
//!
//! A single-slot presenter: at most one message is visible, and each new
//! message replaces the previous one and restarts the dismissal deadline.

use std::time::{ Duration, Instant };


/// Default time a notification stays visible.
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_secs( 3 );


/// A visible notification and its dismissal deadline.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Notification {
    pub message: String,
    pub expires_at: Instant,
}


/// Single-slot, auto-expiring notification presenter.
#[derive( Debug )]
pub struct Notifier {
    duration: Duration,
    current: Option<Notification>,
    shown: u64,
}


impl Notifier {
    /// Creates a notifier whose messages stay visible for `duration`.
    pub fn new( duration: Duration ) -> Self {
        Self {
            duration,
            current: None,
            shown: 0,
        }
    }


    /// Shows a message, replacing whatever is visible.
    pub fn show( &mut self, message: impl Into<String> ) {
        self.show_at( message, Instant::now() );
    }


    /// Shows a message as of `now`.
    pub fn show_at( &mut self, message: impl Into<String>, now: Instant ) {
        let message = message.into();
        tracing::debug!( "Notification: {}", message );
        self.current = Some( Notification {
            message,
            expires_at: now + self.duration,
        });
        self.shown += 1;
    }


    /// Hides the current message if its deadline has passed.
    pub fn expire( &mut self, now: Instant ) {
        if self.current.as_ref().is_some_and( |n| now >= n.expires_at ) {
            self.current = None;
        }
    }


    /// Gets the visible message, if any.
    pub fn current( &self ) -> Option<&str> {
        self.current.as_ref().map( |n| n.message.as_str() )
    }


    /// Total number of messages shown since creation.
    pub fn shown_count( &self ) -> u64 {
        self.shown
    }

}


impl Default for Notifier {
    fn default() -> Self {
        Self::new( DEFAULT_NOTIFICATION_DURATION )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_message_expires_after_duration() {
        let start = Instant::now();
        let mut notifier = Notifier::new( Duration::from_secs( 3 ) );

        notifier.show_at( "hello", start );
        notifier.expire( start + Duration::from_secs( 2 ) );
        assert_eq!( notifier.current(), Some( "hello" ) );

        notifier.expire( start + Duration::from_secs( 3 ) );
        assert_eq!( notifier.current(), None );
    }


    #[test]
    fn test_new_message_restarts_deadline() {
        let start = Instant::now();
        let mut notifier = Notifier::new( Duration::from_secs( 3 ) );

        notifier.show_at( "first", start );
        notifier.show_at( "second", start + Duration::from_secs( 2 ) );

        // The first message's deadline must not hide the second one early.
        notifier.expire( start + Duration::from_secs( 4 ) );
        assert_eq!( notifier.current(), Some( "second" ) );
        assert_eq!( notifier.shown_count(), 2 );

        notifier.expire( start + Duration::from_secs( 5 ) );
        assert_eq!( notifier.current(), None );
    }
}
