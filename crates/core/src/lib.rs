pub mod error;
pub mod media;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use error::{Result, RtspError};
pub use server::{Server, ServerConfig, SourceFactory};
pub use session::SessionRegistry;
