pub mod config;
pub mod engines;
pub mod error;
pub mod network;
pub mod orchestrator;
pub mod registry;
pub mod server;
pub mod types;
pub mod upload;
pub mod utils;

pub use config::Config;
pub use engines::ImageSearch;
pub use error::{Error, Result, UploadError};
pub use orchestrator::{Completion, Navigator, OrchestrationState, SearchOutcome, SearchSession, Services};
pub use registry::{build_redirect_target, EngineRegistry};
pub use types::{EngineMode, ImagePayload, SearchEngineDescriptor, SearchMatch, UploadResult};
pub use upload::{FallbackPolicy, UploadChain, UploadProvider};

// Re-export providers
pub use engines::saucenao::SauceNao;
pub use upload::{Catbox, ImgBb, Telegraph};
