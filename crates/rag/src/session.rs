//! Conversation history per session.

use coursemate_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

/// Stores prior exchanges so follow-up questions keep their context.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a new, empty session and return its id.
    async fn create_session(&self) -> AppResult<String>;

    /// Formatted prior exchanges, or `None` for unknown or empty sessions.
    async fn get_conversation_history(&self, session_id: &str) -> AppResult<Option<String>>;

    /// Record one question/answer pair. Unknown ids start a new session.
    async fn add_exchange(&self, session_id: &str, question: &str, answer: &str) -> AppResult<()>;

    /// Forget a session.
    async fn clear_session(&self, session_id: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "User" => Some(Self::User),
            "Assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

fn format_history<'a>(messages: impl IntoIterator<Item = (Speaker, &'a str)>) -> Option<String> {
    let lines: Vec<String> = messages
        .into_iter()
        .map(|(speaker, text)| format!("{}: {}", speaker.label(), text))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Process-local history keeping the last `max_history` exchanges per session.
pub struct InMemorySessionStore {
    max_history: usize,
    counter: AtomicU64,
    sessions: RwLock<HashMap<String, Vec<(Speaker, String)>>>,
}

impl InMemorySessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            counter: AtomicU64::new(0),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned<T>(_: T) -> AppError {
        AppError::Session("session store lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self) -> AppResult<String> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("session_{}", n);
        self.sessions
            .write()
            .map_err(Self::poisoned)?
            .insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn get_conversation_history(&self, session_id: &str) -> AppResult<Option<String>> {
        let sessions = self.sessions.read().map_err(Self::poisoned)?;
        let history = sessions.get(session_id).and_then(|messages| {
            format_history(messages.iter().map(|(speaker, text)| (*speaker, text.as_str())))
        });
        Ok(history)
    }

    async fn add_exchange(&self, session_id: &str, question: &str, answer: &str) -> AppResult<()> {
        let mut sessions = self.sessions.write().map_err(Self::poisoned)?;
        let messages = sessions.entry(session_id.to_string()).or_default();
        messages.push((Speaker::User, question.to_string()));
        messages.push((Speaker::Assistant, answer.to_string()));

        let keep = self.max_history * 2;
        if messages.len() > keep {
            messages.drain(..messages.len() - keep);
        }
        Ok(())
    }

    async fn clear_session(&self, session_id: &str) -> AppResult<()> {
        self.sessions
            .write()
            .map_err(Self::poisoned)?
            .remove(session_id);
        Ok(())
    }
}

/// History kept in a SQLite file, so a session id stays valid across
/// processes. Keeps the last `max_history` exchanges per session.
pub struct SqliteSessionStore {
    max_history: usize,
    conn: Mutex<Connection>,
}

fn sql_error(context: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::Session(format!("{}: {}", context, e))
}

impl SqliteSessionStore {
    /// Open (or create) the session database at `db_path`.
    pub fn open(db_path: &Path, max_history: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).map_err(sql_error("Failed to open session database"))?;
        tracing::debug!("Opened session database at {:?}", db_path);
        Self::with_connection(conn, max_history)
    }

    pub fn in_memory(max_history: usize) -> AppResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(sql_error("Failed to open session database"))?;
        Self::with_connection(conn, max_history)
    }

    fn with_connection(conn: Connection, max_history: usize) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS session_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                speaker TEXT NOT NULL,
                content TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS session_messages_by_session
                ON session_messages (session_id, seq);
            "#,
        )
        .map_err(sql_error("Failed to create session tables"))?;

        Ok(Self {
            max_history,
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Session("Session connection lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create_session(&self) -> AppResult<String> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(sql_error("Failed to begin transaction"))?;

        let next: i64 = tx
            .query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM sessions", [], |row| row.get(0))
            .map_err(sql_error("Failed to allocate session id"))?;
        let id = format!("session_{}", next);
        tx.execute("INSERT INTO sessions (seq, id) VALUES (?1, ?2)", params![next, id])
            .map_err(sql_error("Failed to create session"))?;

        tx.commit().map_err(sql_error("Failed to commit session"))?;
        Ok(id)
    }

    async fn get_conversation_history(&self, session_id: &str) -> AppResult<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT speaker, content FROM session_messages
                 WHERE session_id = ?1 ORDER BY seq",
            )
            .map_err(sql_error("Failed to prepare history query"))?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(sql_error("Failed to read history"))?;

        let mut messages = Vec::new();
        for row in rows {
            let (speaker, content) = row.map_err(sql_error("Failed to read history"))?;
            match Speaker::from_label(&speaker) {
                Some(speaker) => messages.push((speaker, content)),
                None => tracing::warn!("Skipping message with unknown speaker '{}'", speaker),
            }
        }

        let history = format_history(messages.iter().map(|(speaker, text)| (*speaker, text.as_str())));
        Ok(history)
    }

    async fn add_exchange(&self, session_id: &str, question: &str, answer: &str) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(sql_error("Failed to begin transaction"))?;

        let known = tx
            .query_row("SELECT 1 FROM sessions WHERE id = ?1", params![session_id], |_| Ok(()))
            .optional()
            .map_err(sql_error("Failed to look up session"))?;
        if known.is_none() {
            tx.execute("INSERT INTO sessions (id) VALUES (?1)", params![session_id])
                .map_err(sql_error("Failed to create session"))?;
        }

        for (speaker, text) in [(Speaker::User, question), (Speaker::Assistant, answer)] {
            tx.execute(
                "INSERT INTO session_messages (session_id, speaker, content) VALUES (?1, ?2, ?3)",
                params![session_id, speaker.label(), text],
            )
            .map_err(sql_error("Failed to record exchange"))?;
        }

        let keep = (self.max_history * 2) as i64;
        tx.execute(
            "DELETE FROM session_messages WHERE session_id = ?1 AND seq NOT IN (
                 SELECT seq FROM session_messages WHERE session_id = ?1
                 ORDER BY seq DESC LIMIT ?2
             )",
            params![session_id, keep],
        )
        .map_err(sql_error("Failed to trim history"))?;

        tx.commit().map_err(sql_error("Failed to commit exchange"))
    }

    async fn clear_session(&self, session_id: &str) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM session_messages WHERE session_id = ?1", params![session_id])
            .map_err(sql_error("Failed to clear session"))?;
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
            .map_err(sql_error("Failed to clear session"))?;
        Ok(())
    }
}
