pub mod fingerprint;
pub use fingerprint::{Fingerprint, GenerationRequest};

pub mod generation_cache;
pub use generation_cache::{CachedGeneration, Generation, GenerationCache, GenerationStore};

pub mod prompts;
pub mod sanitize;
pub mod timeline;

pub use sanitize::{TextSanitizer, sanitizer_from_name};
pub use timeline::{TimelineEntry, merge_timeline};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;

pub mod thread_service;
pub mod thread_service_impl;
pub use thread_service::{
    CreatedThread, PublicThread, PublishResult, ThreadDetail, ThreadError, ThreadService,
    ThreadSummary,
};
pub use thread_service_impl::SeaOrmThreadService;

pub mod conversation_service;
pub mod conversation_service_impl;
pub use conversation_service::{
    AnalyzeRequest, AnalyzeResult, ConversationError, ConversationService, ThreadReply,
};
pub use conversation_service_impl::DefaultConversationService;
