use relay_harness::{ConversationTurn, Role};

/// Message as shown to the user.
///
/// Content grows by `append` while the message is open. Once finalized the
/// message is immutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayMessage {
    id: uuid::Uuid,
    role: Role,
    content: String,
    finalized: bool,
}

impl DisplayMessage {
    pub(crate) fn open(role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            role,
            content: String::new(),
            finalized: false,
        }
    }

    pub(crate) fn finalized(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            role,
            content: content.into(),
            finalized: true,
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Appends text; returns false (and changes nothing) once finalized.
    pub(crate) fn append(&mut self, text: &str) -> bool {
        if self.finalized {
            return false;
        }
        self.content.push_str(text);
        true
    }

    /// Replaces the content and freezes the message.
    pub(crate) fn replace_and_finalize(&mut self, content: &str) {
        if !self.finalized {
            self.content.clear();
            self.content.push_str(content);
            self.finalized = true;
        }
    }

    pub(crate) fn finalize(&mut self) {
        self.finalized = true;
    }

    pub(crate) fn to_turn(&self) -> ConversationTurn {
        ConversationTurn::new(self.role, self.content.clone())
    }
}

/// Receives a snapshot every time a message is added or grows.
pub trait MessageSink: Send {
    fn render(&mut self, message: &DisplayMessage);
}

/// Sink that ignores every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn render(&mut self, _message: &DisplayMessage) {}
}

impl<F> MessageSink for F
where
    F: FnMut(&DisplayMessage) + Send,
{
    fn render(&mut self, message: &DisplayMessage) {
        self(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalized_message_rejects_appends() {
        let mut message = DisplayMessage::open(Role::Assistant);
        assert!(message.append("Hel"));
        message.replace_and_finalize("sorry");
        assert!(!message.append("lo"));
        assert_eq!(message.content(), "sorry");
        message.replace_and_finalize("again");
        assert_eq!(message.content(), "sorry");
    }

    #[test]
    fn ids_are_unique() {
        let a = DisplayMessage::open(Role::Assistant);
        let b = DisplayMessage::finalized(Role::User, "hi");
        assert_ne!(a.id(), b.id());
        assert!(b.is_finalized());
        assert_eq!(b.to_turn(), ConversationTurn::user("hi"));
    }
}
