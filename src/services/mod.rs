pub mod did_client;
pub mod llm_client;
pub mod reply_generator;
pub mod retry;
pub mod video_renderer;

// Re-export for convenience
pub use did_client::{DidClient, VideoError};
pub use llm_client::{GeminiClient, LlmError, TextGenerator};
pub use reply_generator::{Reply, ReplyGenerator, ReplySource};
pub use video_renderer::{RenderOutcome, RenderSettings, VideoRenderer};
