pub mod collaborators;
pub mod error;
pub mod model;

pub use collaborators::{Converter, SpectrogramRenderer, TitleLookup};
pub use error::{AppError, ConversionError, SpectrogramError, StoreError, TitleLookupError};
pub use model::{DownloadRecord, EnqueueOutcome, SessionEvent, SessionPhase, FALLBACK_TITLE};
