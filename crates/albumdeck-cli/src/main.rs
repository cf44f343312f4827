//! Albumdeck CLI - Terminal UI album player

mod cli;
mod input;
mod logging;
mod settings;
mod view;

use std::io;
use std::time::{ Duration, Instant };

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{ self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind },
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
    ExecutableCommand,
};
use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{ Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap },
};
use tokio::sync::mpsc;

use cli::Args;
use input::{ InputBuffer, InputMode };
use settings::Settings;
use view::ViewMode;

use albumdeck_core::{
    command::{ self, SeekTarget },
    playlist::display_name,
    AlbumShelf, AudioBackend, Command, FolderMetadata, LoadError, LoadedFolder, Notifier,
    PlaybackController, PlaybackState, PlaylistLoader,
};


/// Seconds moved by the arrow keys.
const SEEK_STEP: Duration = Duration::from_secs( 5 );

/// Percentage points moved by `+` and `-`.
const VOLUME_STEP: u32 = 10;


/// Results of background work, delivered to the UI loop.
enum AppEvent {
    /// A folder finished loading; its first track should start.
    FolderLoaded {
        folder: String,
        result: Result<LoadedFolder, LoadError>,
    },

    /// Hover metadata for a shelf card.
    InfoFetched {
        folder: String,
        info: FolderMetadata,
    },
}


/// Application state.
struct App {
    controller: PlaybackController<AudioBackend>,
    loader: PlaylistLoader,
    shelf: AlbumShelf,
    settings: Settings,
    should_quit: bool,

    // View state
    view_mode: ViewMode,
    shelf_state: ListState,
    playlist_state: ListState,

    // Input state
    input_mode: InputMode,
    input_buffer: InputBuffer,

    // Background results
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,

    // Areas from the last draw, for mouse hit detection
    shelf_area: Option<Rect>,
    playlist_area: Option<Rect>,
    seek_area: Option<Rect>,
}


impl App {
    /// Creates a new App instance.
    fn new( args: &Args, settings: Settings ) -> Self {
        let songs_dir = settings.songs_dir( args.songs.as_deref() );
        tracing::info!( "Songs directory: {:?}", songs_dir );

        let notifier = Notifier::new( Duration::from_secs( settings.notification_secs ) );
        let controller = PlaybackController::new( AudioBackend::new(), notifier )
            .with_skip_limit( settings.skip_limit );

        let shelf = AlbumShelf::scan( &songs_dir, &settings.cover_names );
        let mut shelf_state = ListState::default();
        if !shelf.is_empty() {
            shelf_state.select( Some( 0 ) );
        }

        let ( events_tx, events_rx ) = mpsc::unbounded_channel();

        Self {
            controller,
            loader: PlaylistLoader::new( songs_dir ),
            shelf,
            settings,
            should_quit: false,
            view_mode: ViewMode::default(),
            shelf_state,
            playlist_state: ListState::default(),
            input_mode: InputMode::default(),
            input_buffer: InputBuffer::new(),
            events_tx,
            events_rx,
            shelf_area: None,
            playlist_area: None,
            seek_area: None,
        }
    }


    /// Drains background results and advances playback.
    fn tick( &mut self ) {
        while let Ok( event ) = self.events_rx.try_recv() {
            self.handle_event( event );
        }

        self.controller.tick( Instant::now() );
    }


    fn handle_event( &mut self, event: AppEvent ) {
        match event {
            AppEvent::FolderLoaded { folder, result } => {
                if self.controller.open_loaded( &folder, result ) {
                    self.show_playlist();
                }
            }
            AppEvent::InfoFetched { folder, info } => {
                self.shelf.set_info( &folder, info );
            }
        }
    }


    fn show_playlist( &mut self ) {
        self.sync_playlist_selection();
        self.view_mode = ViewMode::Playlist;
    }


    /// Loads a folder in the background and plays it when ready.
    fn open_folder( &self, folder: String ) {
        let loader = self.loader.clone();
        let tx = self.events_tx.clone();

        tracing::info!( "Loading album: {}", folder );
        tokio::spawn( async move {
            let result = loader.load( &folder ).await;
            let _ = tx.send( AppEvent::FolderLoaded { folder, result } );
        });
    }


    /// Fetches hover info for the selected card. Every call reads afresh.
    ///
    /// Failures only reach the log.
    fn fetch_selected_info( &self ) {
        let Some( card ) = self.shelf.selected() else {
            return;
        };

        let folder = card.folder.clone();
        let loader = self.loader.clone();
        let tx = self.events_tx.clone();

        tokio::spawn( async move {
            match loader.fetch_info( &folder ).await {
                Ok( info ) => {
                    let _ = tx.send( AppEvent::InfoFetched { folder, info } );
                }
                Err( e ) => tracing::error!( "Hover info for '{}' failed: {}", folder, e ),
            }
        });
    }


    fn handle_key( &mut self, code: KeyCode ) {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key( code ),
            InputMode::Command => self.handle_command_key( code ),
        }
    }


    /// Handles mouse events.
    fn handle_mouse( &mut self, column: u16, row: u16, kind: MouseEventKind ) {
        match kind {
            MouseEventKind::Down( MouseButton::Left ) => {
                if let Some( fraction ) = self.seek_area.and_then( |a| fraction_in( a, column, row ) ) {
                    self.controller.seek( fraction );
                    return;
                }

                match self.view_mode {
                    ViewMode::Albums => {
                        let offset = self.shelf_state.offset();
                        if let Some( index ) = self.shelf_area.and_then( |a| row_in( a, column, row, offset ) ) {
                            if index < self.shelf.len() {
                                self.select_card( index );
                                self.open_selected();
                            }
                        }
                    }
                    ViewMode::Playlist => {
                        let offset = self.playlist_state.offset();
                        if let Some( index ) = self.playlist_area.and_then( |a| row_in( a, column, row, offset ) ) {
                            if index < self.controller.playlist().len() {
                                self.playlist_state.select( Some( index ) );
                                self.controller.play_at( index );
                            }
                        }
                    }
                    ViewMode::Help => {}
                }
            }
            MouseEventKind::ScrollUp => self.move_selection( false ),
            MouseEventKind::ScrollDown => self.move_selection( true ),
            _ => {}
        }
    }


    fn handle_normal_key( &mut self, code: KeyCode ) {
        if self.view_mode == ViewMode::Help {
            if matches!( code, KeyCode::Esc | KeyCode::Char( '?' ) | KeyCode::Char( 'q' ) ) {
                self.view_mode = ViewMode::Albums;
            }
            return;
        }

        match code {
            KeyCode::Char( 'q' ) => self.should_quit = true,
            KeyCode::Char( '/' ) => {
                self.input_mode = InputMode::Command;
                self.input_buffer.clear();
            }
            KeyCode::Char( '?' ) => self.view_mode = ViewMode::Help,
            KeyCode::Tab => self.view_mode = self.view_mode.next_tab(),
            KeyCode::Char( ' ' ) => self.controller.toggle_play_pause(),
            KeyCode::Char( 'n' ) => {
                self.controller.next();
                self.sync_playlist_selection();
            }
            KeyCode::Char( 'p' ) => {
                self.controller.previous();
                self.sync_playlist_selection();
            }
            KeyCode::Left => {
                let elapsed = self.controller.progress().elapsed;
                self.controller.seek_to( elapsed.saturating_sub( SEEK_STEP ) );
            }
            KeyCode::Right => {
                let elapsed = self.controller.progress().elapsed;
                self.controller.seek_to( elapsed + SEEK_STEP );
            }
            KeyCode::Char( '+' ) | KeyCode::Char( '=' ) => {
                let percent = self.volume_percent().saturating_add( VOLUME_STEP );
                self.controller.set_volume( percent );
            }
            KeyCode::Char( '-' ) => {
                let percent = self.volume_percent().saturating_sub( VOLUME_STEP );
                self.controller.set_volume( percent );
            }
            KeyCode::Up | KeyCode::Char( 'k' ) => self.move_selection( false ),
            KeyCode::Down | KeyCode::Char( 'j' ) => self.move_selection( true ),
            KeyCode::Enter => match self.view_mode {
                ViewMode::Albums => self.open_selected(),
                ViewMode::Playlist => {
                    if let Some( index ) = self.playlist_state.selected() {
                        self.controller.play_at( index );
                    }
                }
                ViewMode::Help => {}
            },
            _ => {}
        }
    }


    fn handle_command_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Enter => {
                let input = self.input_buffer.take();
                self.input_mode = InputMode::Normal;
                self.execute_command( &input );
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                if !self.input_buffer.pop() {
                    self.input_mode = InputMode::Normal;
                }
            }
            KeyCode::Char( c ) => self.input_buffer.push( c ),
            _ => {}
        }
    }


    fn execute_command( &mut self, input: &str ) {
        match Command::parse( input ) {
            Ok( cmd ) => self.run_command( cmd ),
            Err( e ) => self.controller.notify( e.to_string() ),
        }
    }


    fn run_command( &mut self, cmd: Command ) {
        match cmd {
            Command::Toggle => self.controller.toggle_play_pause(),
            Command::Next => {
                self.controller.next();
                self.sync_playlist_selection();
            }
            Command::Prev => {
                self.controller.previous();
                self.sync_playlist_selection();
            }
            Command::Seek { target: SeekTarget::At( position ) } => self.controller.seek_to( position ),
            Command::Seek { target: SeekTarget::Fraction( fraction ) } => self.controller.seek( fraction ),
            Command::Volume { percent } => self.controller.set_volume( percent ),
            Command::Open { folder } => self.open_folder( folder ),
            Command::Albums => {
                self.shelf = AlbumShelf::scan( self.loader.root(), &self.settings.cover_names );
                self.shelf_state.select( if self.shelf.is_empty() { None } else { Some( 0 ) } );
                self.view_mode = ViewMode::Albums;
                self.controller.notify( format!( "Found {} albums", self.shelf.len() ) );
            }
            Command::Help => self.view_mode = ViewMode::Help,
            Command::Quit => self.should_quit = true,
        }
    }


    /// Moves the list selection of the current view.
    fn move_selection( &mut self, down: bool ) {
        match self.view_mode {
            ViewMode::Albums => {
                let moved = if down { self.shelf.select_next() } else { self.shelf.select_previous() };
                if moved.is_some() {
                    self.shelf_state.select( Some( self.shelf.selected_index() ) );
                    self.fetch_selected_info();
                }
            }
            ViewMode::Playlist => {
                let len = self.controller.playlist().len();
                if len == 0 {
                    return;
                }
                let current = self.playlist_state.selected().unwrap_or( 0 );
                let index = if down { ( current + 1 ) % len } else { ( current + len - 1 ) % len };
                self.playlist_state.select( Some( index ) );
            }
            ViewMode::Help => {}
        }
    }


    fn select_card( &mut self, index: usize ) {
        if self.shelf.select( index ).is_some() {
            self.shelf_state.select( Some( index ) );
            self.fetch_selected_info();
        }
    }


    fn open_selected( &mut self ) {
        match self.shelf.selected() {
            Some( card ) => self.open_folder( card.folder.clone() ),
            None => self.controller.notify( "No albums found" ),
        }
    }


    fn sync_playlist_selection( &mut self ) {
        if !self.controller.playlist().is_empty() {
            self.playlist_state.select( Some( self.controller.playlist().cursor() ) );
        }
    }


    fn volume_percent( &self ) -> u32 {
        ( self.controller.volume().unwrap_or( 1.0 ) * 100.0 ).round() as u32
    }
}


/// Row index under the cursor inside a bordered list.
fn row_in( area: Rect, column: u16, row: u16, offset: usize ) -> Option<usize> {
    let inside = column > area.x && column < area.x + area.width.saturating_sub( 1 )
        && row > area.y && row < area.y + area.height.saturating_sub( 1 );
    inside.then( || offset + ( row - area.y - 1 ) as usize )
}


/// Horizontal click position as a fraction of `area`'s width.
fn fraction_in( area: Rect, column: u16, row: u16 ) -> Option<f64> {
    let inside = area.width > 0
        && column >= area.x && column < area.x + area.width
        && row >= area.y && row < area.y + area.height;
    inside.then( || ( column - area.x ) as f64 / area.width as f64 )
}


#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = logging::init( args.log_file.clone() )?;
    tracing::info!( "Albumdeck {} starting, logging to {:?}", env!( "CARGO_PKG_VERSION" ), log_path );

    let settings = Settings::load();
    let mut app = App::new( &args, settings );

    if let Some( folder ) = args.album.as_deref() {
        if app.controller.open_folder( &app.loader, folder ).await {
            app.show_playlist();
        }
    }
    app.fetch_selected_info();

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;
    io::stdout().execute( crossterm::event::EnableMouseCapture )?;

    let mut terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;

    let result = run( &mut terminal, &mut app );

    // Cleanup
    io::stdout().execute( crossterm::event::DisableMouseCapture )?;
    disable_raw_mode()?;
    io::stdout().execute( LeaveAlternateScreen )?;

    tracing::info!( "Albumdeck exiting" );
    result
}


fn run( terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App ) -> Result<()> {
    loop {
        app.tick();

        terminal.draw( |frame| draw_ui( frame, app ) )?;

        if event::poll( Duration::from_millis( 100 ) )? {
            match event::read()? {
                Event::Key( key ) if key.kind == KeyEventKind::Press => {
                    app.handle_key( key.code );
                }
                Event::Mouse( mouse ) => {
                    app.handle_mouse( mouse.column, mouse.row, mouse.kind );
                }
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}


/// Draws the main UI.
fn draw_ui( frame: &mut Frame, app: &mut App ) {
    let chunks = Layout::default()
        .direction( Direction::Vertical )
        .constraints([
            Constraint::Length( 2 ),  // Header
            Constraint::Min( 0 ),     // Main content
            Constraint::Length( 5 ),  // Now playing
            Constraint::Length( 1 ),  // Status bar
        ])
        .split( frame.area() );

    let album = app.controller.folder_info()
        .and_then( |i| i.title.clone() )
        .or_else( || app.controller.folder().map( str::to_string ) );
    let header_text = match album {
        Some( album ) => format!( "  ALBUMDECK - {} - {}", app.view_mode.title(), album ),
        None => format!( "  ALBUMDECK - {}", app.view_mode.title() ),
    };
    let header = Paragraph::new( header_text )
        .style( Style::default().fg( Color::Cyan ).bold() )
        .block( Block::default().borders( Borders::BOTTOM ) );
    frame.render_widget( header, chunks[0] );

    app.shelf_area = None;
    app.playlist_area = None;
    match app.view_mode {
        ViewMode::Albums => draw_albums( frame, app, chunks[1] ),
        ViewMode::Playlist => draw_playlist( frame, app, chunks[1] ),
        ViewMode::Help => draw_help( frame, chunks[1] ),
    }

    draw_now_playing( frame, app, chunks[2] );
    draw_status_bar( frame, app, chunks[3] );
}


fn draw_albums( frame: &mut Frame, app: &mut App, area: Rect ) {
    let columns = Layout::default()
        .direction( Direction::Horizontal )
        .constraints([ Constraint::Percentage( 50 ), Constraint::Percentage( 50 ) ])
        .split( area );

    app.shelf_area = Some( columns[0] );

    let items: Vec<ListItem> = app.shelf
        .cards()
        .iter()
        .map( |card| {
            let style = if card.cover_loaded {
                Style::default()
            } else {
                Style::default().fg( Color::DarkGray ).italic()
            };
            ListItem::new( format!( "  {}", card.label() ) ).style( style )
        })
        .collect();

    let list = List::new( items )
        .block( Block::default()
            .title( format!( " Albums ({}) ", app.shelf.len() ) )
            .borders( Borders::ALL )
        )
        .highlight_style( Style::default().bg( Color::DarkGray ) )
        .highlight_symbol( ">> " );
    frame.render_stateful_widget( list, columns[0], &mut app.shelf_state );

    // Hover overlay for the selected card
    let details = match app.shelf.selected() {
        Some( card ) => {
            let mut lines = vec![
                Line::from( Span::styled( card.label(), Style::default().bold() ) ),
                Line::from( Span::styled( card.folder.clone(), Style::default().fg( Color::Gray ) ) ),
                Line::from( "" ),
            ];
            match card.info.as_ref() {
                Some( _ ) => lines.push( Line::from( card.description().to_string() ) ),
                None => lines.push( Line::from( Span::styled( "...", Style::default().fg( Color::DarkGray ) ) ) ),
            }
            lines
        }
        None => vec![ Line::from( format!( "No albums in {}", app.loader.root().display() ) ) ],
    };

    let overlay = Paragraph::new( details )
        .block( Block::default().title( " Album " ).borders( Borders::ALL ) )
        .wrap( Wrap { trim: true } );
    frame.render_widget( overlay, columns[1] );
}


fn draw_playlist( frame: &mut Frame, app: &mut App, area: Rect ) {
    app.playlist_area = Some( area );

    let playlist = app.controller.playlist();
    let playing = app.controller.now_playing();

    let items: Vec<ListItem> = playlist
        .tracks()
        .iter()
        .map( |path| {
            let prefix = if Some( path.as_path() ) == playing { "▶ " } else { "  " };
            ListItem::new( format!( "{}{}", prefix, display_name( path ) ) )
        })
        .collect();

    let title = match app.controller.folder() {
        Some( folder ) => format!( " {} ({}) ", folder, playlist.len() ),
        None => " Playlist ".to_string(),
    };

    let list = List::new( items )
        .block( Block::default().title( title ).borders( Borders::ALL ) )
        .highlight_style( Style::default().bg( Color::DarkGray ) )
        .highlight_symbol( ">> " );

    frame.render_stateful_widget( list, area, &mut app.playlist_state );
}


fn draw_help( frame: &mut Frame, area: Rect ) {
    let help = Paragraph::new( command::help_text() )
        .block( Block::default().title( " Help " ).borders( Borders::ALL ) )
        .alignment( Alignment::Left );
    frame.render_widget( help, area );
}


fn draw_now_playing( frame: &mut Frame, app: &mut App, area: Rect ) {
    let state_str = match app.controller.state() {
        PlaybackState::Playing => "▶",
        PlaybackState::Paused => "⏸",
        PlaybackState::Idle => "■",
    };
    let title = app.controller.now_playing_name()
        .unwrap_or_else( || "No track".to_string() );

    let block = Block::default().title( " Now Playing " ).borders( Borders::ALL );
    let inner = block.inner( area );
    frame.render_widget( block, area );

    let rows = Layout::default()
        .direction( Direction::Vertical )
        .constraints([ Constraint::Length( 1 ), Constraint::Length( 1 ), Constraint::Min( 0 ) ])
        .split( inner );

    frame.render_widget(
        Paragraph::new( Span::styled( format!( " {} {}", state_str, title ), Style::default().bold() ) ),
        rows[0],
    );

    let progress = app.controller.progress();
    let ratio = progress.percent().map( |p| ( p / 100.0 ).clamp( 0.0, 1.0 ) ).unwrap_or( 0.0 );
    let gauge = Gauge::default()
        .gauge_style( Style::default().fg( Color::Cyan ).bg( Color::Black ) )
        .ratio( ratio )
        .label( progress.label() );
    frame.render_widget( gauge, rows[1] );
    app.seek_area = Some( rows[1] );

    let volume = match app.controller.volume() {
        Some( v ) => format!( " Volume {}%", ( v * 100.0 ).round() as u32 ),
        None => " Volume 100%".to_string(),
    };
    frame.render_widget(
        Paragraph::new( volume ).style( Style::default().fg( Color::Gray ) ),
        rows[2],
    );
}


fn draw_status_bar( frame: &mut Frame, app: &App, area: Rect ) {
    let ( text, style ) = match app.input_mode {
        InputMode::Command => {
            ( format!( "/{}", app.input_buffer.content() ), Style::default().fg( Color::Yellow ) )
        }
        InputMode::Normal => match app.controller.notifier().current() {
            Some( msg ) => ( format!( " {}", msg ), Style::default().fg( Color::Green ) ),
            None => {
                let hint = match app.view_mode {
                    ViewMode::Albums => " [/]Cmd [Tab]Views [Enter]Play album [Space]Play [n/p]Skip [?]Help [q]Quit ",
                    ViewMode::Playlist => " [/]Cmd [Tab]Views [Enter]Play [Space]Play [←/→]Seek [+/-]Vol [?]Help ",
                    ViewMode::Help => " [?]Close [Esc]Close ",
                };
                ( hint.to_string(), Style::default().fg( Color::DarkGray ) )
            }
        },
    };

    frame.render_widget( Paragraph::new( text ).style( style ), area );

    if app.input_mode == InputMode::Command {
        let cursor_x = area.x + 1 + app.input_buffer.char_len() as u16;
        frame.set_cursor_position(( cursor_x, area.y ));
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use std::fs;
    use std::path::Path;


    fn write_title( root: &Path, folder: &str, title: &str ) {
        let dir = root.join( folder );
        fs::create_dir_all( &dir ).unwrap();
        fs::write( dir.join( "info.json" ), format!( r#"{{"title": "{}", "songs": []}}"#, title ) ).unwrap();
    }


    fn app_for( root: &Path ) -> App {
        let args = Args { songs: Some( root.to_path_buf() ), album: None, log_file: None };
        App::new( &args, Settings::default() )
    }


    async fn apply_next_event( app: &mut App ) {
        let event = app.events_rx.recv().await.unwrap();
        app.handle_event( event );
    }


    #[tokio::test]
    async fn test_hover_reads_info_on_every_selection() {
        let root = tempfile::tempdir().unwrap();
        write_title( root.path(), "jazz", "First Pressing" );

        let mut app = app_for( root.path() );
        app.select_card( 0 );
        apply_next_event( &mut app ).await;
        assert_eq!( app.shelf.selected().map( |c| c.label() ), Some( "First Pressing".to_string() ) );

        write_title( root.path(), "jazz", "Remaster" );
        app.select_card( 0 );
        apply_next_event( &mut app ).await;
        assert_eq!( app.shelf.selected().map( |c| c.label() ), Some( "Remaster".to_string() ) );
    }


    #[tokio::test]
    async fn test_empty_album_load_stays_on_shelf() {
        let root = tempfile::tempdir().unwrap();
        write_title( root.path(), "quiet", "Quiet" );

        let mut app = app_for( root.path() );
        app.open_folder( "quiet".to_string() );
        apply_next_event( &mut app ).await;

        assert_eq!( app.view_mode, ViewMode::Albums );
        assert_eq!( app.controller.notifier().current(), Some( "No songs found in quiet" ) );
        assert!( !app.controller.has_session() );
    }


    #[test]
    fn test_row_in_skips_borders() {
        let area = Rect::new( 0, 2, 20, 6 );
        assert_eq!( row_in( area, 5, 2, 0 ), None );
        assert_eq!( row_in( area, 5, 3, 0 ), Some( 0 ) );
        assert_eq!( row_in( area, 5, 4, 3 ), Some( 4 ) );
        assert_eq!( row_in( area, 0, 4, 0 ), None );
        assert_eq!( row_in( area, 5, 7, 0 ), None );
    }


    #[test]
    fn test_fraction_in() {
        let area = Rect::new( 10, 5, 40, 1 );
        assert_eq!( fraction_in( area, 10, 5 ), Some( 0.0 ) );
        assert_eq!( fraction_in( area, 30, 5 ), Some( 0.5 ) );
        assert_eq!( fraction_in( area, 50, 5 ), None );
        assert_eq!( fraction_in( area, 30, 6 ), None );
    }
}
