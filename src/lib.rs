//! Date-aware decorative background layers for terminal emulator windows.
//!
//! A *pack* is a folder with a `catpack.json` describing which image to show
//! on which days. [`resolver::PackResolver`] picks today's image,
//! [`compositor::add_image`] turns it into a pack-owned background layer and
//! [`session::Session`] wires both to a [`host::HostWindow`].

pub mod compositor;
pub mod error;
pub mod host;
pub mod layer;
pub mod logging;
pub mod pack;
pub mod probe;
pub mod resolver;
pub mod session;
pub mod settings;

pub use error::PackError;
pub use session::{HostEvent, Session};
