//! # grievance-state: Grievance Lifecycle Engine
//!
//! Pure, synchronous decision logic for grievance records. Nothing here
//! performs I/O or reads the clock; callers pass `now` in and persist the
//! mutated record themselves.
//!
//! ## Modules
//!
//! - **Grievance** (`grievance.rs`): status enum, the record, caller-driven
//!   actions (submit, accept, set deadline, resolve, dispute), the transition
//!   log, and escalation events.
//!
//! - **Timer** (`timer.rs`): the three SLA timers and the time-driven
//!   transitions the reconciliation sweep applies.
//!
//! - **Role** (`role.rs`): the already-authenticated actor recorded against
//!   each transition.
//!
//! - **View** (`view.rs`): status filters for the role dashboards.

pub mod grievance;
pub mod role;
pub mod timer;
pub mod view;

pub use grievance::{
    validate_time_limit, EscalationEvent, GrievanceAction, GrievanceRecord, GrievanceStatus,
    LifecycleError, Submission, TransitionRecord, ACCEPTANCE_WINDOW_HOURS, DISPUTE_THRESHOLD,
    MAX_RESOLUTION_DAYS, VERIFICATION_WINDOW_DAYS,
};
pub use role::Role;
pub use timer::Timer;
pub use view::QueueView;
