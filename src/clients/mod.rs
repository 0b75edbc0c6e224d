pub mod openai;

pub use openai::{ChatCompletionClient, ChatTransport, GenerationOptions, ReqwestTransport};
