//! Command line entry for the status bar.


/// Current input mode of the application.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum InputMode {
    /// Normal mode - keyboard shortcuts active.
    #[default]
    Normal,

    /// Command mode - typing a slash command.
    Command,
}


/// Append-only text buffer for slash commands.
#[derive( Debug, Default )]
pub struct InputBuffer {
    content: String,
}


impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }


    pub fn push( &mut self, c: char ) {
        self.content.push( c );
    }


    /// Removes the last character. Returns false when already empty.
    pub fn pop( &mut self ) -> bool {
        self.content.pop().is_some()
    }


    /// Takes the typed text, leaving the buffer empty.
    pub fn take( &mut self ) -> String {
        std::mem::take( &mut self.content )
    }


    pub fn clear( &mut self ) {
        self.content.clear();
    }


    pub fn content( &self ) -> &str {
        &self.content
    }


    /// Width of the typed text in characters, for cursor placement.
    pub fn char_len( &self ) -> usize {
        self.content.chars().count()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_pop_handles_multibyte() {
        let mut buffer = InputBuffer::new();
        for c in "vol ü".chars() {
            buffer.push( c );
        }
        assert_eq!( buffer.char_len(), 5 );
        assert!( buffer.pop() );
        assert_eq!( buffer.content(), "vol " );
    }


    #[test]
    fn test_take_empties() {
        let mut buffer = InputBuffer::new();
        buffer.push( 'n' );
        assert_eq!( buffer.take(), "n" );
        assert!( !buffer.pop() );
    }
}
