use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Key of the per-turn [`TurnCredentials`](crate::TurnCredentials).
pub const TURN_CREDENTIALS_KEY: &str = "gsm.turn.credentials";
/// Key of the per-turn [`ConversationOperations`](crate::ConversationOperations).
pub const CONVERSATION_OPERATIONS_KEY: &str = "gsm.turn.conversationOperations";
/// Key of the bot application id the turn runs as.
pub const BOT_APP_ID_KEY: &str = "gsm.turn.botAppId";

type Entry = Arc<dyn Any + Send + Sync>;

/// Extensible state owned by exactly one turn and dropped with it.
///
/// ```
/// use gsm_bridge::TurnState;
///
/// let mut state = TurnState::new();
/// state.insert("greeting", String::from("hello"));
/// assert_eq!(state.get::<String>("greeting").as_deref().map(String::as_str), Some("hello"));
/// assert!(state.get::<u32>("greeting").is_none());
/// ```
#[derive(Clone, Default)]
pub struct TurnState {
    entries: HashMap<String, Entry>,
}

impl TurnState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.entries.insert(key.into(), Arc::new(value));
    }

    pub fn insert_arc<T>(&mut self, key: impl Into<String>, value: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        self.entries.insert(key.into(), value);
    }

    /// Returns the entry under `key` when it holds a `T`.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.entries
            .get(key)
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("TurnState").field("keys", &keys).finish()
    }
}
