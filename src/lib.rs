pub mod artifact;
pub mod cancel;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod query;
pub mod scanner;

pub use artifact::{artifact_name, ArtifactFile, TimeSource};
pub use config::{AppConfig, CollectionConfig};
pub use cursor::Cursor;
pub use cancel::CancelToken;
pub use engine::{AnchorMode, CollectionInfo, Page, PageEngine};
pub use error::Error;
pub use grouping::{CaptureEvent, EventGrouper};
pub use query::{EventView, ListPageRequest, ListPageResponse};
