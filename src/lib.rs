pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod pinning;
pub mod store;
pub mod vault;

pub use config::Config;
pub use error::{Error, Result};
pub use pinning::{PinMetadata, PinReceipt, PinningService};
pub use store::{ArchiveIndex, ArchiveRecord, NewArchiveRecord};
pub use vault::VaultConfig;
