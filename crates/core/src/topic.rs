//! Keyword based topic gating.

use fitchat_model::Message;

/// Keywords of the health and wellbeing topics served by default.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "health",
    "wellbeing",
    "mental",
    "fitness",
    "nutrition",
    "stress",
    "wellness",
    "exercise",
    "diet",
    "therapy",
    "meditation",
    "self-care",
];

/// Decides whether a conversation is within the served topics.
///
/// The check is a case-insensitive substring search over the content of
/// every message, regardless of its role. A single keyword anywhere in
/// the conversation admits it, so once a relevant message has been
/// exchanged, later turns stay admitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicGate {
    keywords: Vec<String>,
}

impl TopicGate {
    /// Creates a gate matching the given keywords.
    ///
    /// Keywords are lowercased, and empty ones are dropped since they
    /// would match anything.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Returns the keywords of this gate.
    #[inline]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns `true` if any message mentions any keyword.
    pub fn is_in_scope(&self, conversation: &[Message]) -> bool {
        conversation.iter().any(|msg| self.matches(&msg.content))
    }

    /// Returns `true` if the text mentions any keyword.
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

impl Default for TopicGate {
    fn default() -> Self {
        Self::with_keywords(DEFAULT_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keywords() {
        let gate = TopicGate::default();
        for keyword in DEFAULT_KEYWORDS {
            let conversation = [Message::user(format!("Tell me about {keyword}"))];
            assert!(gate.is_in_scope(&conversation), "{keyword}");
        }
        assert!(!gate.is_in_scope(&[Message::user(
            "What's the capital of France?"
        )]));
    }

    #[test]
    fn test_case_insensitive_substring() {
        let gate = TopicGate::default();
        assert!(gate.is_in_scope(&[Message::user("STRESSED out")]));
        assert!(gate.is_in_scope(&[Message::user("Any DIETARY advice?")]));
        assert!(gate.is_in_scope(&[Message::user("Self-Care routines")]));
        // Substrings inside unrelated words count too.
        assert!(gate.is_in_scope(&[Message::user("I love dieting robots")]));
    }

    #[test]
    fn test_empty_conversation() {
        let gate = TopicGate::default();
        assert!(!gate.is_in_scope(&[]));
    }

    #[test]
    fn test_any_message_any_role() {
        let gate = TopicGate::default();
        let conversation = [
            Message::assistant("Ask me about fitness!"),
            Message::user("What's the capital of France?"),
        ];
        assert!(gate.is_in_scope(&conversation));

        let conversation = [
            Message::system("Talk about wellness."),
            Message::user("Tell me a joke."),
        ];
        assert!(gate.is_in_scope(&conversation));
    }

    #[test]
    fn test_mixed_message() {
        let gate = TopicGate::default();
        let conversation = [Message::user(
            "Besides my taxes, my car and the weather, I keep worrying \
             about my mental state.",
        )];
        assert!(gate.is_in_scope(&conversation));
    }

    #[test]
    fn test_custom_keywords() {
        let gate = TopicGate::with_keywords(["Yoga", ""]);
        assert_eq!(gate.keywords(), ["yoga"]);
        assert!(gate.is_in_scope(&[Message::user("yoga at dawn")]));
        assert!(!gate.is_in_scope(&[Message::user("health")]));
    }
}
