pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use capture::{EncodedImage, ImageSource, ImageTray, PreviewHandle, UploadedImage};
pub use client::{
    parse_plan, AnalysisClient, DryrunService, GeminiService, GenerationRequest,
    GenerationService,
};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, SessionError, FALLBACK_ERROR_MESSAGE};
pub use session::{AppState, Session};
