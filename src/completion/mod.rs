pub mod client;
pub mod commentary;
pub mod error;
pub mod queue;
pub mod recommend;

pub use client::{
    CompletionBackend, CompletionClient, CompletionRequest, Message, OpenAiBackend, Role,
};
pub use commentary::{CommentaryService, MarketCommentary};
pub use error::CompletionError;
pub use queue::RequestQueue;
pub use recommend::RecommendationGenerator;
