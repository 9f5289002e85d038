//! Payloads of the consumed HR events
//!
//! Unknown fields are ignored. Dates are calendar dates, attendance times are
//! UTC timestamps.

use crate::topics::EventKind;
use chrono::{DateTime, NaiveDate, Utc};
use kafka_worker::{EventEnvelope, WorkerError};
use serde::{Deserialize, Serialize};

/// Identity fields shared by employee lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub employee_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl EmployeeRef {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingInvitation {
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub job_title: Option<String>,
    pub invitation_link: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingInitiated {
    pub onboarding_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub invited_by_user_id: Option<String>,
    #[serde(default)]
    pub invited_by_email: Option<String>,
    #[serde(default)]
    pub invitation_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingCompleted {
    pub onboarding_id: String,
    pub user_id: String,
    #[serde(default)]
    pub employee_id: Option<i64>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub login_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingFailed {
    pub onboarding_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub failure_reason: String,
    pub failure_step: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeCreated {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub role: String,
    pub job_title: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub joining_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeePromoted {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub old_position: String,
    pub new_position: String,
    pub old_job_title: String,
    pub new_job_title: String,
    #[serde(default)]
    pub old_salary: Option<f64>,
    #[serde(default)]
    pub new_salary: Option<f64>,
    pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeTerminated {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub termination_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Birthday {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkAnniversary {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub joining_date: NaiveDate,
    pub years_of_service: u32,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbationEnding {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub probation_end_date: NaiveDate,
    pub days_remaining: i64,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub manager_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractExpiring {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub contract_end_date: NaiveDate,
    pub days_remaining: i64,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub manager_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReviewDue {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub review_due_date: NaiveDate,
    pub years_since_joining: u32,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub manager_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryIncrementDue {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub increment_due_date: NaiveDate,
    pub years_of_service: u32,
    pub current_salary: f64,
    pub salary_currency: String,
    #[serde(default)]
    pub manager_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryIncrement {
    #[serde(flatten)]
    pub employee: EmployeeRef,
    pub old_salary: f64,
    pub new_salary: f64,
    pub increment_percentage: f64,
    pub salary_currency: String,
    pub effective_date: NaiveDate,
    pub years_of_service: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequested {
    pub leave_id: i64,
    pub employee_id: i64,
    pub employee_email: String,
    pub employee_name: String,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub manager_email: Option<String>,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_requested: u32,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveApproved {
    pub leave_id: i64,
    pub employee_id: i64,
    pub employee_email: String,
    pub employee_name: String,
    pub approved_by_id: i64,
    #[serde(default)]
    pub approved_by_email: Option<String>,
    #[serde(default)]
    pub approved_by_name: Option<String>,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_approved: u32,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRejected {
    pub leave_id: i64,
    pub employee_id: i64,
    pub employee_email: String,
    pub employee_name: String,
    pub rejected_by_id: i64,
    #[serde(default)]
    pub rejected_by_email: Option<String>,
    #[serde(default)]
    pub rejected_by_name: Option<String>,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_requested: u32,
    pub rejection_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateArrival {
    pub attendance_id: i64,
    pub employee_id: i64,
    pub employee_email: String,
    pub employee_name: String,
    pub check_in_time: DateTime<Utc>,
    pub expected_time: DateTime<Utc>,
    pub minutes_late: i64,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub manager_email: Option<String>,
}

fn first_absence() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsentEmployee {
    pub employee_id: i64,
    pub employee_email: String,
    pub employee_name: String,
    pub absent_date: NaiveDate,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub manager_email: Option<String>,
    #[serde(default = "first_absence")]
    pub consecutive_absences: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeAlert {
    pub attendance_id: i64,
    pub employee_id: i64,
    pub employee_email: String,
    pub employee_name: String,
    pub check_out_time: DateTime<Utc>,
    pub overtime_hours: f64,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub manager_email: Option<String>,
}

/// A consumed event with its payload decoded
#[derive(Debug, Clone, PartialEq)]
pub enum HrEvent {
    Invitation(OnboardingInvitation),
    OnboardingInitiated(OnboardingInitiated),
    OnboardingCompleted(OnboardingCompleted),
    OnboardingFailed(OnboardingFailed),
    EmployeeCreated(EmployeeCreated),
    EmployeePromoted(EmployeePromoted),
    EmployeeTerminated(EmployeeTerminated),
    SalaryIncrement(SalaryIncrement),
    Birthday(Birthday),
    WorkAnniversary(WorkAnniversary),
    ProbationEnding(ProbationEnding),
    ContractExpiring(ContractExpiring),
    PerformanceReviewDue(PerformanceReviewDue),
    SalaryIncrementDue(SalaryIncrementDue),
    LeaveRequested(LeaveRequested),
    LeaveApproved(LeaveApproved),
    LeaveRejected(LeaveRejected),
    LateArrival(LateArrival),
    AbsentEmployee(AbsentEmployee),
    OvertimeAlert(OvertimeAlert),
}

impl HrEvent {
    /// Decode `envelope.data` as the payload `kind` expects
    pub fn parse(kind: EventKind, envelope: &EventEnvelope) -> Result<Self, WorkerError> {
        Ok(match kind {
            EventKind::Invitation => Self::Invitation(envelope.parse_data()?),
            EventKind::OnboardingInitiated => Self::OnboardingInitiated(envelope.parse_data()?),
            EventKind::OnboardingCompleted => Self::OnboardingCompleted(envelope.parse_data()?),
            EventKind::OnboardingFailed => Self::OnboardingFailed(envelope.parse_data()?),
            EventKind::EmployeeCreated => Self::EmployeeCreated(envelope.parse_data()?),
            EventKind::EmployeePromoted => Self::EmployeePromoted(envelope.parse_data()?),
            EventKind::EmployeeTerminated => Self::EmployeeTerminated(envelope.parse_data()?),
            EventKind::SalaryIncrement => Self::SalaryIncrement(envelope.parse_data()?),
            EventKind::Birthday => Self::Birthday(envelope.parse_data()?),
            EventKind::WorkAnniversary => Self::WorkAnniversary(envelope.parse_data()?),
            EventKind::ProbationEnding => Self::ProbationEnding(envelope.parse_data()?),
            EventKind::ContractExpiring => Self::ContractExpiring(envelope.parse_data()?),
            EventKind::PerformanceReviewDue => Self::PerformanceReviewDue(envelope.parse_data()?),
            EventKind::SalaryIncrementDue => Self::SalaryIncrementDue(envelope.parse_data()?),
            EventKind::LeaveRequested => Self::LeaveRequested(envelope.parse_data()?),
            EventKind::LeaveApproved => Self::LeaveApproved(envelope.parse_data()?),
            EventKind::LeaveRejected => Self::LeaveRejected(envelope.parse_data()?),
            EventKind::LateArrival => Self::LateArrival(envelope.parse_data()?),
            EventKind::AbsentEmployee => Self::AbsentEmployee(envelope.parse_data()?),
            EventKind::OvertimeAlert => Self::OvertimeAlert(envelope.parse_data()?),
        })
    }
}
