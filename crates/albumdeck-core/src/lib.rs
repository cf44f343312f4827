//! Albumdeck Core - Album loading and playback control
//!
//! This crate provides the playlist loader, the playback controller and
//! its media session seam, the Symphonia/cpal audio backend, and the
//! album shelf model used by the terminal UI.

pub mod album;
pub mod audio;
pub mod command;
pub mod controller;
pub mod loader;
pub mod notify;
pub mod playlist;
pub mod session;
pub mod time;

pub use album::{ AlbumCard, AlbumShelf };
pub use audio::AudioBackend;
pub use command::{ Command, CommandError, SeekTarget };
pub use controller::{ PlaybackController, PlaybackState, Progress };
pub use loader::{ FolderMetadata, LoadError, LoadedFolder, PlaylistLoader };
pub use notify::Notifier;
pub use playlist::Playlist;
pub use session::{ MediaBackend, MediaSession, SessionError, SessionEvent };
pub use time::format_time;
