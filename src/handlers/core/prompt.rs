//! One-shot line prompts.
//!
//! A prompt suspends command dispatch for its session: the very next line
//! is delivered verbatim to the handler, with no tokenization, alias
//! lookup or authorization, and the prompt is destroyed. Installing a new
//! prompt from inside `feed` chains a multi-step flow; returning
//! [`HandlerError::PromptAbort`](crate::error::HandlerError::PromptAbort)
//! makes the session emit the configured abort message. Either way the
//! mode recorded at installation time is already restored when `feed`
//! runs.

use super::mode::Mode;
use crate::error::HandlerResult;
use crate::state::{Hall, PlayerId};
use async_trait::async_trait;
use std::sync::Arc;

/// The continuation behind a prompt. Consumed by value: a prompt is never
/// re-entered.
#[async_trait]
pub trait PromptHandler: Send {
    async fn feed(
        self: Box<Self>,
        hall: &mut Hall,
        player: PlayerId,
        line: &str,
    ) -> HandlerResult;
}

/// A pending prompt, owned exclusively by one session.
pub struct Prompt {
    /// Text shown when the prompt is installed.
    pub text: String,
    /// Message emitted if the handler aborts.
    pub abort_message: String,
    /// Mode restored once the prompt (or its chain) completes.
    pub restore_mode: Arc<Mode>,
    /// The one-shot continuation.
    pub handler: Box<dyn PromptHandler>,
}

impl Prompt {
    pub fn new(
        text: impl Into<String>,
        abort_message: impl Into<String>,
        restore_mode: Arc<Mode>,
        handler: impl PromptHandler + 'static,
    ) -> Self {
        Self {
            text: text.into(),
            abort_message: abort_message.into(),
            restore_mode,
            handler: Box::new(handler),
        }
    }
}
