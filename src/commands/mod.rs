//! CLI commands implementation

pub mod chunk;
pub mod curriculum;
pub mod embed;
pub mod ingest;
pub mod init;
pub mod playlist;
pub mod rechunk;
pub mod search;
pub mod status;

pub use chunk::*;
pub use curriculum::*;
pub use embed::*;
pub use ingest::*;
pub use init::*;
pub use playlist::*;
pub use rechunk::*;
pub use search::*;
pub use status::*;
