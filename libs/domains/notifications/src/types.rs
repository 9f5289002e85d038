//! Notification types carried by audit events

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    // Onboarding
    Invitation,
    Welcome,
    PasswordSet,

    // Employee lifecycle
    Promotion,
    Termination,
    Transfer,
    ProbationComplete,
    ContractRenewal,
    SalaryIncrement,

    // Celebrations
    Birthday,
    WorkAnniversary,

    // HR alerts
    HrProbationEnding,
    HrContractExpiring,
    HrPerformanceReview,
    HrSalaryIncrementDue,
    HrLeaveBalanceLow,
    HrExcessiveLeave,

    // Leave
    LeaveRequested,
    LeaveApproved,
    LeaveRejected,
    LeaveReminder,

    // Attendance
    LateArrival,
    Absent,
    OvertimeAlert,

    // General
    Reminder,
    Notification,
    Announcement,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_wire_names_are_snake_case() {
        assert_eq!(NotificationType::HrProbationEnding.as_ref(), "hr_probation_ending");
        assert_eq!(
            serde_json::to_value(NotificationType::OvertimeAlert).unwrap(),
            "overtime_alert"
        );
        assert_eq!(
            "leave_approved".parse::<NotificationType>().unwrap(),
            NotificationType::LeaveApproved
        );
    }

    #[test]
    fn test_every_variant_round_trips_through_display() {
        assert_eq!(NotificationType::iter().count(), 27);
        for kind in NotificationType::iter() {
            assert_eq!(kind.to_string().parse::<NotificationType>().unwrap(), kind);
        }
    }
}
