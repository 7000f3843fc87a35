use std::fmt;

use fitchat_model::{Message, Role};

use crate::GREETING;

/// Stable identity of a conversation item.
///
/// Ids are never reused within a conversation, so a streaming reply keeps
/// targeting its own item whatever gets pushed after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A message of the conversation, tagged with its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    id: MessageId,
    message: Message,
}

impl Item {
    /// Returns the id of the item.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the message.
    #[inline]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Returns the author of the message.
    #[inline]
    pub fn role(&self) -> Role {
        self.message.role
    }

    /// Returns the text of the message.
    #[inline]
    pub fn content(&self) -> &str {
        &self.message.content
    }
}

/// The ordered messages shown to the user.
///
/// Items are only ever appended; mutation is limited to the content of an
/// existing item, addressed by id.
#[derive(Clone, Debug)]
pub struct Conversation {
    items: Vec<Item>,
    next_id: u64,
}

impl Conversation {
    /// Creates a conversation seeded with one assistant message.
    pub fn with_greeting<S: Into<String>>(greeting: S) -> Self {
        let mut conversation = Self {
            items: Vec::new(),
            next_id: 1,
        };
        conversation.push(Message::assistant(greeting));
        conversation
    }

    /// Returns all items in order.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the conversation has no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the most recent item.
    #[inline]
    pub fn last(&self) -> Option<&Item> {
        self.items.last()
    }

    /// Looks up an item by id.
    pub fn get(&self, id: MessageId) -> Option<&Item> {
        self.position(id).map(|idx| &self.items[idx])
    }

    /// Returns the messages in wire order.
    pub fn messages(&self) -> Vec<Message> {
        self.items.iter().map(|item| item.message.clone()).collect()
    }

    pub(crate) fn push(&mut self, message: Message) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.items.push(Item { id, message });
        id
    }

    /// Appends a fragment to the content of an item. Returns `false` if
    /// the item doesn't exist.
    pub(crate) fn append_to(&mut self, id: MessageId, fragment: &str) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        self.items[idx].message.content.push_str(fragment);
        true
    }

    /// Replaces the content of an item. Returns `false` if the item
    /// doesn't exist.
    pub(crate) fn set_content(&mut self, id: MessageId, content: &str) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let slot = &mut self.items[idx].message.content;
        slot.clear();
        slot.push_str(content);
        true
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        // Ids grow with the index, so a binary search is enough.
        self.items.binary_search_by_key(&id, |item| item.id).ok()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_greeting(GREETING)
    }
}
