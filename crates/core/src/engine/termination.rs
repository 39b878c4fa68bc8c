//! Timeout escalation as an explicit state machine.
//!
//! A supervised process moves `Running -> SignaledTerm -> Killed`. Each
//! supervisor event yields the action the caller must perform, so the races
//! between a deadline, the grace timer and a natural exit are decided here
//! and not in nested timers.

/// How far termination has escalated for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStage {
    /// No deadline has fired.
    Running,
    /// The graceful termination signal was sent.
    SignaledTerm,
    /// The process was force-killed after the grace window.
    Killed,
    /// The process exited before any deadline fired.
    Exited,
}

/// Something the supervisor observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    DeadlineReached,
    GraceExpired,
    ProcessExited,
}

/// What the supervisor must do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorAction {
    None,
    SendTerminate,
    ForceKill,
}

impl TerminationStage {
    /// Applies an event, returning the next stage and the action to take.
    ///
    /// A process that exits after being signaled keeps the escalated stage so
    /// the caller can still report that the deadline fired.
    pub fn advance(self, event: SupervisorEvent) -> (Self, SupervisorAction) {
        use SupervisorAction as A;
        use SupervisorEvent as E;
        use TerminationStage as S;

        match (self, event) {
            (S::Running, E::DeadlineReached) => (S::SignaledTerm, A::SendTerminate),
            (S::Running, E::ProcessExited) => (S::Exited, A::None),
            // No grace timer runs before the deadline.
            (S::Running, E::GraceExpired) => (S::Running, A::None),
            (S::SignaledTerm, E::GraceExpired) => (S::Killed, A::ForceKill),
            (S::SignaledTerm, E::DeadlineReached | E::ProcessExited) => (S::SignaledTerm, A::None),
            (S::Killed, _) => (S::Killed, A::None),
            (S::Exited, _) => (S::Exited, A::None),
        }
    }

    /// Whether the deadline fired for this process.
    pub fn is_escalated(self) -> bool {
        matches!(self, Self::SignaledTerm | Self::Killed)
    }

    /// Whether the grace timer should be armed.
    pub fn awaiting_grace(self) -> bool {
        self == Self::SignaledTerm
    }
}
