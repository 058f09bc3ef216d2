use shared::domain::Workdir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    HasSession,
}

/// The single piece of client-side session state: the workdir of the active conversion.
///
/// Absent at start, replaced wholesale by each successful convert or retry, never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    workdir: Option<Workdir>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session seeded with a workdir obtained out of band, e.g. from an earlier run.
    pub fn resume(workdir: Workdir) -> Self {
        Self {
            workdir: Some(workdir),
        }
    }

    pub fn workdir(&self) -> Option<&Workdir> {
        self.workdir.as_ref()
    }

    pub fn state(&self) -> SessionState {
        match self.workdir {
            Some(_) => SessionState::HasSession,
            None => SessionState::NoSession,
        }
    }

    pub(crate) fn replace(&mut self, workdir: Workdir) -> Option<Workdir> {
        self.workdir.replace(workdir)
    }
}
