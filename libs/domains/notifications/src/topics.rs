//! Consumed and published Kafka topics
//!
//! Every consumed topic is one row of [`TOPIC_ROUTES`]. Aliases are extra rows
//! pointing at the same [`EventKind`].

use strum::{AsRefStr, Display, EnumIter, IntoStaticStr};

/// Logical handler behind one or more topics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, IntoStaticStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Invitation,
    OnboardingInitiated,
    OnboardingCompleted,
    OnboardingFailed,
    EmployeeCreated,
    EmployeePromoted,
    EmployeeTerminated,
    SalaryIncrement,
    Birthday,
    WorkAnniversary,
    ProbationEnding,
    ContractExpiring,
    PerformanceReviewDue,
    SalaryIncrementDue,
    LeaveRequested,
    LeaveApproved,
    LeaveRejected,
    LateArrival,
    AbsentEmployee,
    OvertimeAlert,
}

impl EventKind {
    /// Handler name for logs and metrics
    pub fn name(self) -> &'static str {
        self.into()
    }
}

pub const TOPIC_ROUTES: &[(&str, EventKind)] = &[
    ("notification-invitation-email", EventKind::Invitation),
    ("user-onboarding-initiated", EventKind::OnboardingInitiated),
    ("notification-welcome-email", EventKind::OnboardingCompleted),
    ("user-onboarding-completed", EventKind::OnboardingCompleted),
    ("user-onboarding-failed", EventKind::OnboardingFailed),
    ("employee-created", EventKind::EmployeeCreated),
    ("employee-promoted", EventKind::EmployeePromoted),
    ("employee-terminated", EventKind::EmployeeTerminated),
    ("employee-salary-increment", EventKind::SalaryIncrement),
    ("employee-special-birthday", EventKind::Birthday),
    ("employee-special-work-anniversary", EventKind::WorkAnniversary),
    ("hr-probation-ending", EventKind::ProbationEnding),
    ("hr-contract-expiring", EventKind::ContractExpiring),
    ("hr-performance-review-due", EventKind::PerformanceReviewDue),
    ("hr-salary-increment-due", EventKind::SalaryIncrementDue),
    ("leave-requested", EventKind::LeaveRequested),
    ("notification-leave-pending", EventKind::LeaveRequested),
    ("leave-approved", EventKind::LeaveApproved),
    ("notification-leave-approved", EventKind::LeaveApproved),
    ("leave-rejected", EventKind::LeaveRejected),
    ("notification-leave-rejected", EventKind::LeaveRejected),
    ("attendance-late", EventKind::LateArrival),
    ("notification-late-arrival", EventKind::LateArrival),
    ("attendance-absent", EventKind::AbsentEmployee),
    ("notification-absent-employee", EventKind::AbsentEmployee),
    ("notification-overtime-alert", EventKind::OvertimeAlert),
];

pub fn subscribed_topics() -> impl Iterator<Item = &'static str> {
    TOPIC_ROUTES.iter().map(|(topic, _)| *topic)
}

// Published
pub const NOTIFICATION_SENT: &str = "notification-sent";
pub const NOTIFICATION_FAILED: &str = "notification-failed";
pub const NOTIFICATION_DELIVERED: &str = "notification-delivered";
pub const AUDIT_NOTIFICATION_ACTION: &str = "audit-notification-action";

pub const NOTIFICATION_SENT_EVENT: &str = "notification.sent";
pub const NOTIFICATION_FAILED_EVENT: &str = "notification.failed";
