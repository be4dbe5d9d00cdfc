//! Chat assistant flow
//!
//! Holds the ordered transcript of one chat session (memory only, never
//! persisted) and the single-flight send cycle: a user turn is appended,
//! the whole transcript plus the fixed persona instruction goes to the LLM,
//! and exactly one assistant turn comes back, the model's reply on success
//! or a fixed apology on failure. A user turn is never left unanswered.
//!
//! The pure state transitions (`begin_user_turn` / `resolve`) are separated
//! from the network call so the transcript invariants are testable without
//! an LLM.

use thiserror::Error;

use crate::llm::{ChatCompleter, ChatMessage, LlmError};

/// Seed assistant turn shown before any user input
pub const GREETING: &str = "👋 مرحباً! أنا مساعدك الذكي للأفلام. كيف يمكنني مساعدتك اليوم؟";

/// Substituted assistant turn when delivery fails
pub const APOLOGY: &str = "عذراً، حدث خطأ في الاتصال بالخادم. يرجى المحاولة مرة أخرى. 😔";

/// Persona and response-language policy sent with every request
const SYSTEM_PROMPT: &str = "أنت مساعد ذكي متخصص في الأفلام. اسمك 'مساعد الأفلام الذكي'. \
    تساعد المستخدمين في اكتشاف الأفلام والحصول على توصيات وإجابات عن أسئلتهم حول الأفلام. \
    كن ودوداً ومفيداً واستخدم الإيموجي بشكل مناسب. \
    أجب باللغة العربية أو الإنجليزية حسب لغة السؤال.";

/// Who produced a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of the transcript
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

/// LLM call failed while a user turn was awaiting its response
#[derive(Debug, Error)]
#[error("Chat delivery failed: {0}")]
pub struct ChatDeliveryError(#[from] pub LlmError);

/// Why a user turn was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty or whitespace-only input
    EmptyInput,
    /// A prior turn is still awaiting its assistant response
    AwaitingResponse,
}

/// Result of one send cycle
#[derive(Debug)]
pub enum SendOutcome {
    /// Assistant turn appended from the model's reply
    Delivered,
    /// Apology turn appended in place of the model's reply
    Failed(ChatDeliveryError),
    /// Input rejected; transcript unchanged
    Rejected(RejectReason),
}

/// One chat session: append-only transcript plus the awaiting-response flag.
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    awaiting: bool,
}

impl ChatSession {
    /// New session seeded with exactly one assistant greeting turn.
    pub fn new() -> Self {
        Self {
            turns: vec![ChatTurn {
                role: TurnRole::Assistant,
                content: GREETING.to_string(),
            }],
            awaiting: false,
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    /// Latest assistant turn (always present; the transcript is seeded).
    pub fn last_assistant(&self) -> &str {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::Assistant)
            .map(|t| t.content.as_str())
            .unwrap_or(GREETING)
    }

    /// Accept a user turn: validate, append, and mark awaiting.
    ///
    /// Rejected input leaves the transcript untouched. Once accepted, the
    /// caller must follow up with [`resolve`](Self::resolve) so the user
    /// turn gets its assistant response attempt.
    pub fn begin_user_turn(&mut self, text: &str) -> Result<(), RejectReason> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RejectReason::EmptyInput);
        }
        if self.awaiting {
            return Err(RejectReason::AwaitingResponse);
        }
        self.turns.push(ChatTurn {
            role: TurnRole::User,
            content: text.to_string(),
        });
        self.awaiting = true;
        Ok(())
    }

    /// Messages for the completion request: the fixed system instruction
    /// followed by the entire accumulated transcript.
    pub fn request_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        for turn in &self.turns {
            messages.push(match turn.role {
                TurnRole::User => ChatMessage::user(&*turn.content),
                TurnRole::Assistant => ChatMessage::assistant(&*turn.content),
            });
        }
        messages
    }

    /// Close the cycle opened by `begin_user_turn`: append the assistant
    /// reply, or the fixed apology on failure, and clear the awaiting flag
    /// either way.
    pub fn resolve(&mut self, result: Result<String, LlmError>) -> SendOutcome {
        let outcome = match result {
            Ok(reply) => {
                self.turns.push(ChatTurn {
                    role: TurnRole::Assistant,
                    content: reply,
                });
                SendOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!("Chat delivery failed, substituting apology: {}", e);
                self.turns.push(ChatTurn {
                    role: TurnRole::Assistant,
                    content: APOLOGY.to_string(),
                });
                SendOutcome::Failed(ChatDeliveryError(e))
            }
        };
        self.awaiting = false;
        outcome
    }

    /// Full send cycle against a completer.
    pub async fn send_user_turn(
        &mut self,
        completer: &dyn ChatCompleter,
        text: &str,
    ) -> SendOutcome {
        if let Err(reason) = self.begin_user_turn(text) {
            return SendOutcome::Rejected(reason);
        }
        let result = completer.complete(&self.request_messages()).await;
        self.resolve(result)
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use async_trait::async_trait;

    struct EchoCompleter;

    #[async_trait]
    impl ChatCompleter for EchoCompleter {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            let last = messages.last().expect("request always has messages");
            Ok(format!("echo: {}", last.content))
        }
    }

    struct FailingCompleter;

    #[async_trait]
    impl ChatCompleter for FailingCompleter {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
            Err(LlmError::Timeout("30s elapsed".to_string()))
        }
    }

    #[test]
    fn test_session_seeded_with_one_greeting() {
        let session = ChatSession::new();
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.turns()[0].role, TurnRole::Assistant);
        assert_eq!(session.turns()[0].content, GREETING);
        assert!(!session.is_awaiting());
    }

    #[test]
    fn test_empty_input_rejected_without_append() {
        let mut session = ChatSession::new();
        assert_eq!(session.begin_user_turn(""), Err(RejectReason::EmptyInput));
        assert_eq!(
            session.begin_user_turn("   \n\t"),
            Err(RejectReason::EmptyInput)
        );
        assert_eq!(session.turns().len(), 1);
        assert!(!session.is_awaiting());
    }

    #[test]
    fn test_single_flight_guard() {
        let mut session = ChatSession::new();
        session.begin_user_turn("ما أفضل أفلام الخيال العلمي؟").unwrap();
        assert!(session.is_awaiting());

        assert_eq!(
            session.begin_user_turn("سؤال آخر"),
            Err(RejectReason::AwaitingResponse)
        );
        // Guard rejection appends nothing
        assert_eq!(session.turns().len(), 2);

        session.resolve(Ok("جرب Blade Runner 🎬".to_string()));
        assert!(!session.is_awaiting());
        assert!(session.begin_user_turn("سؤال آخر").is_ok());
    }

    #[test]
    fn test_request_carries_system_prompt_and_full_transcript() {
        let mut session = ChatSession::new();
        session.begin_user_turn("hello").unwrap();

        let messages = session.request_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("مساعد الأفلام الذكي"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, GREETING);
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(messages[2].content, "hello");
    }

    #[tokio::test]
    async fn test_send_success_grows_transcript_by_two() {
        let mut session = ChatSession::new();
        let outcome = session.send_user_turn(&EchoCompleter, "hello").await;

        assert!(matches!(outcome, SendOutcome::Delivered));
        assert_eq!(session.turns().len(), 3);
        assert_eq!(session.last_assistant(), "echo: hello");
        assert!(!session.is_awaiting());
    }

    #[tokio::test]
    async fn test_send_failure_substitutes_apology() {
        let mut session = ChatSession::new();
        let outcome = session.send_user_turn(&FailingCompleter, "hello").await;

        assert!(matches!(outcome, SendOutcome::Failed(_)));
        // Same growth as success: user turn + substituted assistant turn
        assert_eq!(session.turns().len(), 3);
        assert_eq!(session.last_assistant(), APOLOGY);
        assert!(!session.is_awaiting());
    }

    #[tokio::test]
    async fn test_session_usable_after_failure() {
        let mut session = ChatSession::new();
        session.send_user_turn(&FailingCompleter, "first").await;
        let outcome = session.send_user_turn(&EchoCompleter, "second").await;

        assert!(matches!(outcome, SendOutcome::Delivered));
        assert_eq!(session.turns().len(), 5);
        assert_eq!(session.last_assistant(), "echo: second");
    }

    #[tokio::test]
    async fn test_no_two_consecutive_user_turns() {
        let mut session = ChatSession::new();
        session.send_user_turn(&FailingCompleter, "a").await;
        session.send_user_turn(&EchoCompleter, "b").await;
        session.send_user_turn(&EchoCompleter, "").await;

        for pair in session.turns().windows(2) {
            assert!(
                !(pair[0].role == TurnRole::User && pair[1].role == TurnRole::User),
                "user turn left unanswered"
            );
        }
    }
}
