//! Conversational retrieval-and-answer pipeline
//!
//! The core of the service: turning a new user message plus prior
//! conversation into a retrieval query, a ranked and filtered set of
//! supporting passages (local or web), a generated answer, and a
//! persisted, possibly auto-titled, chat record.
//!
//! Stages, leaves first:
//!
//! - [`window`]: bounded, role-separated slice of chat history
//! - [`query`]: retrieval query composition
//! - [`retrieval`]: local similarity search with relevance filtering and
//!   layered web fallback
//! - [`generation`]: grounded prompt construction and don't-know retry
//! - [`title`]: sentinel-gated automatic chat titling
//! - [`session`]: per-message orchestration over the injected
//!   capabilities

pub mod generation;
pub mod query;
pub mod retrieval;
pub mod session;
pub mod title;
pub mod window;

pub use generation::{looks_unknown, AnswerGenerator, GeneratedAnswer};
pub use query::{compose_query, ASSISTANT_TAIL, USER_TAIL};
pub use retrieval::{Retrieval, RetrievalEngine, RetrievalOrigin, RELEVANCE_CUTOFF};
pub use session::{
    ChatService, MessageReply, OneShotReply, PostMessageRequest, SourceItem,
};
pub use title::{is_default_title, sanitize_title, TitleMaintainer};
pub use window::{format_transcript, recent_window, WINDOW_SIZE};
