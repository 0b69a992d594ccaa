use super::message::Session;

/// Sessions known to the backend plus the one currently open
///
/// Pure bookkeeping; the remote calls live on the chat controller.
#[derive(Debug, Clone, Default)]
pub struct SessionDirectory {
    sessions: Vec<Session>,
    active: Option<Session>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_id() == Some(id)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Replace the listing wholesale
    pub fn replace_all(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions;
    }

    /// Put a freshly created session first and open it
    pub fn insert_active(&mut self, session: Session) {
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session.clone());
        self.active = Some(session);
    }

    pub fn set_active(&mut self, session: Session) {
        self.active = Some(session);
    }

    /// Drop a session from the listing. Returns true if it was the active one.
    pub fn remove(&mut self, id: &str) -> bool {
        self.sessions.retain(|s| s.id != id);
        if self.is_active(id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Swap in an updated copy of a session, wherever it is referenced
    pub fn update(&mut self, session: Session) {
        if let Some(entry) = self.sessions.iter_mut().find(|s| s.id == session.id) {
            *entry = session.clone();
        }
        if self.is_active(&session.id) {
            self.active = Some(session);
        }
    }
}
