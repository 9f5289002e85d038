//! Turns decoded HR events into outbound emails
//!
//! Composition is pure: no I/O, no clock. Manager-facing emails are skipped
//! when the event carries no `manager_email`.

use crate::events::*;
use crate::types::NotificationType;
use email::{
    CongratulationsContext, EmailContext, NotificationContext, ReminderContext, Urgency,
    WelcomeContext,
};

const MANAGER: &str = "Manager";

/// One email ready to be rendered and delivered
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub notification_type: NotificationType,
    pub context: EmailContext,
}

impl OutboundEmail {
    fn new(
        recipient_email: impl Into<String>,
        recipient_name: impl Into<String>,
        subject: impl Into<String>,
        notification_type: NotificationType,
        context: impl Into<EmailContext>,
    ) -> Self {
        Self {
            recipient_email: recipient_email.into(),
            recipient_name: recipient_name.into(),
            subject: subject.into(),
            notification_type,
            context: context.into(),
        }
    }

    /// Notification emails use their title as the subject
    fn notification(
        recipient_email: impl Into<String>,
        notification_type: NotificationType,
        context: NotificationContext,
    ) -> Self {
        let recipient_name = context.username.clone();
        let subject = context.title.clone();
        Self::new(recipient_email, recipient_name, subject, notification_type, context)
    }
}

#[derive(Debug, Clone)]
pub struct Composer {
    base_url: String,
    company_name: String,
}

impl Composer {
    pub fn new(base_url: impl Into<String>, company_name: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            company_name: company_name.into(),
        }
    }

    pub fn link(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn compose(&self, event: &HrEvent) -> Vec<OutboundEmail> {
        match event {
            HrEvent::Invitation(e) => vec![self.invitation(e)],
            HrEvent::OnboardingInitiated(e) => vec![self.onboarding_initiated(e)],
            HrEvent::OnboardingCompleted(e) => vec![self.onboarding_completed(e)],
            HrEvent::OnboardingFailed(e) => vec![self.onboarding_failed(e)],
            HrEvent::EmployeeCreated(e) => vec![employee_created(e)],
            HrEvent::EmployeePromoted(e) => vec![employee_promoted(e)],
            HrEvent::EmployeeTerminated(e) => vec![self.employee_terminated(e)],
            HrEvent::SalaryIncrement(e) => vec![salary_increment(e)],
            HrEvent::Birthday(e) => vec![birthday(e)],
            HrEvent::WorkAnniversary(e) => vec![work_anniversary(e)],
            HrEvent::ProbationEnding(e) => self.probation_ending(e),
            HrEvent::ContractExpiring(e) => self.contract_expiring(e),
            HrEvent::PerformanceReviewDue(e) => self.performance_review_due(e).into_iter().collect(),
            HrEvent::SalaryIncrementDue(_) => Vec::new(),
            HrEvent::LeaveRequested(e) => self.leave_requested(e).into_iter().collect(),
            HrEvent::LeaveApproved(e) => vec![self.leave_approved(e)],
            HrEvent::LeaveRejected(e) => vec![self.leave_rejected(e)],
            HrEvent::LateArrival(e) => late_arrival(e).into_iter().collect(),
            HrEvent::AbsentEmployee(e) => absent_employee(e).into_iter().collect(),
            HrEvent::OvertimeAlert(e) => overtime_alert(e).into_iter().collect(),
        }
    }

    fn invitation(&self, e: &OnboardingInvitation) -> OutboundEmail {
        let mut reminder = ReminderContext::new(
            &e.email,
            "Complete Your Onboarding",
            format!(
                "Welcome! You have been invited to join our team as {}. Please click the button \
                 below to complete your account setup and start your journey with us.",
                e.role
            ),
        )
        .with_urgency(Urgency::Medium)
        .with_detail("Position", e.job_title.as_deref().unwrap_or(&e.role))
        .with_detail("Role", &e.role)
        .with_action(&e.invitation_link, "Complete Onboarding");

        if let Some(expires_at) = e.expires_at {
            reminder = reminder.with_due_date(expires_at.format("%Y-%m-%d").to_string());
        }

        OutboundEmail::new(
            &e.email,
            &e.email,
            "You're Invited to Join Our Team!",
            NotificationType::Invitation,
            reminder,
        )
    }

    fn onboarding_initiated(&self, e: &OnboardingInitiated) -> OutboundEmail {
        let name = format!("{} {}", e.first_name, e.last_name);
        let url = e
            .invitation_url
            .clone()
            .unwrap_or_else(|| self.link("signup"));

        let reminder = ReminderContext::new(
            &name,
            "Complete Your Onboarding",
            format!(
                "Welcome to the team! You have been invited to join as {}. Please click the \
                 button below to complete your account setup and start your journey with us.",
                e.role
            ),
        )
        .with_urgency(Urgency::Medium)
        .with_detail("Position", e.job_title.as_deref().unwrap_or(&e.role))
        .with_detail("Department", e.department.as_deref().unwrap_or("Not Assigned"))
        .with_action(url, "Complete Onboarding");

        OutboundEmail::new(
            &e.email,
            name,
            "You're Invited to Join Our Team!",
            NotificationType::Invitation,
            reminder,
        )
    }

    fn onboarding_completed(&self, e: &OnboardingCompleted) -> OutboundEmail {
        let name = format!("{} {}", e.first_name, e.last_name);
        let url = e.login_url.clone().unwrap_or_else(|| self.link("login"));

        let mut welcome =
            WelcomeContext::new(&name, &e.email).with_action(url, "Get Started");
        welcome.employee_id = e.employee_id.map(|id| id.to_string());
        welcome.department = e.department.clone();
        welcome.role = Some(e.job_title.clone().unwrap_or_else(|| e.role.clone()));
        welcome.start_date = e.start_date.clone();

        OutboundEmail::new(
            &e.email,
            name,
            format!("Welcome to {}!", self.company_name),
            NotificationType::Welcome,
            welcome,
        )
    }

    fn onboarding_failed(&self, e: &OnboardingFailed) -> OutboundEmail {
        let mut context = NotificationContext::new(
            format!("{} {}", e.first_name, e.last_name),
            "Onboarding Issue",
            format!(
                "There was an issue with your onboarding process at step: {}. Our HR team has \
                 been notified and will contact you shortly.",
                e.failure_step
            ),
        )
        .with_detail("Issue", &e.failure_reason)
        .with_detail("Step", &e.failure_step)
        .with_action(self.link("support"), "Contact Support");
        context.notification_title = Some("Onboarding Status Update".to_string());

        OutboundEmail::notification(&e.email, NotificationType::Notification, context)
    }

    fn employee_terminated(&self, e: &EmployeeTerminated) -> OutboundEmail {
        let context = NotificationContext::new(
            e.employee.full_name(),
            "Employment Status Update",
            format!(
                "Your employment has been terminated effective {}. Please contact HR for any \
                 questions about your final pay or benefits.",
                e.termination_date
            ),
        )
        .with_detail("Termination Date", e.termination_date.to_string())
        .with_detail("Reason", e.reason.as_deref().unwrap_or("Not specified"))
        .with_action(self.link("hr-contact"), "Contact HR");

        OutboundEmail::notification(&e.employee.email, NotificationType::Termination, context)
    }

    fn probation_ending(&self, e: &ProbationEnding) -> Vec<OutboundEmail> {
        let name = e.employee.full_name();
        let mut emails = Vec::with_capacity(2);

        if let Some(manager_email) = &e.manager_email {
            let reminder = ReminderContext::new(
                MANAGER,
                "Employee Probation Review Required",
                format!(
                    "The probation period for {} is ending in {} days. Please complete the \
                     probation review before the end date.",
                    name, e.days_remaining
                ),
            )
            .with_due_date(e.probation_end_date.to_string())
            .with_urgency(urgency_within(e.days_remaining, 7))
            .with_detail("Employee", &name)
            .with_detail("Email", &e.employee.email)
            .with_detail("Probation End Date", e.probation_end_date.to_string())
            .with_detail("Days Remaining", e.days_remaining.to_string())
            .with_action(self.link("reviews"), "Complete Review");

            emails.push(OutboundEmail::new(
                manager_email,
                MANAGER,
                format!("Probation Ending: {}", name),
                NotificationType::HrProbationEnding,
                reminder,
            ));
        }

        let context = NotificationContext::new(
            &name,
            "Probation Period Update",
            format!(
                "Your probation period is ending on {}. Your manager will be conducting a \
                 review soon.",
                e.probation_end_date
            ),
        )
        .with_detail("Probation End Date", e.probation_end_date.to_string())
        .with_detail("Days Remaining", e.days_remaining.to_string());

        emails.push(OutboundEmail::notification(
            &e.employee.email,
            NotificationType::HrProbationEnding,
            context,
        ));
        emails
    }

    fn contract_expiring(&self, e: &ContractExpiring) -> Vec<OutboundEmail> {
        let name = e.employee.full_name();
        let mut emails = Vec::with_capacity(2);

        if let Some(manager_email) = &e.manager_email {
            let reminder = ReminderContext::new(
                MANAGER,
                "Employee Contract Renewal Required",
                format!(
                    "The contract for {} is expiring in {} days. Please initiate the renewal \
                     process if applicable.",
                    name, e.days_remaining
                ),
            )
            .with_due_date(e.contract_end_date.to_string())
            .with_urgency(urgency_within(e.days_remaining, 14))
            .with_detail("Employee", &name)
            .with_detail("Email", &e.employee.email)
            .with_detail("Contract End Date", e.contract_end_date.to_string())
            .with_detail("Days Remaining", e.days_remaining.to_string())
            .with_action(self.link("contracts"), "Manage Contract");

            emails.push(OutboundEmail::new(
                manager_email,
                MANAGER,
                format!("Contract Expiring: {}", name),
                NotificationType::HrContractExpiring,
                reminder,
            ));
        }

        let context = NotificationContext::new(
            &name,
            "Contract Expiration Notice",
            format!(
                "Your contract is expiring on {}. Please contact HR for information about \
                 renewal.",
                e.contract_end_date
            ),
        )
        .with_detail("Contract End Date", e.contract_end_date.to_string())
        .with_detail("Days Remaining", e.days_remaining.to_string())
        .with_action(self.link("hr-contact"), "Contact HR");

        emails.push(OutboundEmail::notification(
            &e.employee.email,
            NotificationType::HrContractExpiring,
            context,
        ));
        emails
    }

    fn performance_review_due(&self, e: &PerformanceReviewDue) -> Option<OutboundEmail> {
        let manager_email = e.manager_email.as_ref()?;
        let name = e.employee.full_name();

        let reminder = ReminderContext::new(
            MANAGER,
            "Annual Performance Review",
            format!(
                "The annual performance review for {} is due on {}. This marks their {} year \
                 anniversary with the company.",
                name, e.review_due_date, e.years_since_joining
            ),
        )
        .with_due_date(e.review_due_date.to_string())
        .with_urgency(Urgency::Medium)
        .with_detail("Employee", &name)
        .with_detail("Years with Company", e.years_since_joining.to_string())
        .with_detail("Review Due Date", e.review_due_date.to_string())
        .with_action(self.link("reviews"), "Start Review");

        Some(OutboundEmail::new(
            manager_email,
            MANAGER,
            format!("Performance Review Due: {}", name),
            NotificationType::HrPerformanceReview,
            reminder,
        ))
    }

    fn leave_requested(&self, e: &LeaveRequested) -> Option<OutboundEmail> {
        let manager_email = e.manager_email.as_ref()?;

        let mut context = NotificationContext::new(
            MANAGER,
            "Leave Request Pending Approval",
            format!(
                "{} has requested {} days of {} leave. Please review and respond.",
                e.employee_name, e.days_requested, e.leave_type
            ),
        )
        .with_detail("Employee", &e.employee_name)
        .with_detail("Leave Type", &e.leave_type)
        .with_detail("Start Date", e.start_date.to_string())
        .with_detail("End Date", e.end_date.to_string())
        .with_detail("Days Requested", e.days_requested.to_string())
        .with_detail("Reason", e.reason.as_deref().unwrap_or("Not specified"))
        .with_action(self.link("leave-requests"), "Review Request");
        context.notification_title = Some("New Leave Request".to_string());

        Some(OutboundEmail::notification(
            manager_email,
            NotificationType::LeaveRequested,
            context,
        ))
    }

    fn leave_approved(&self, e: &LeaveApproved) -> OutboundEmail {
        let mut context = NotificationContext::new(
            &e.employee_name,
            "Leave Request Approved",
            format!(
                "Your {} leave request has been approved! Enjoy your time off.",
                e.leave_type
            ),
        )
        .with_detail("Leave Type", &e.leave_type)
        .with_detail("Start Date", e.start_date.to_string())
        .with_detail("End Date", e.end_date.to_string())
        .with_detail("Days Approved", e.days_approved.to_string())
        .with_detail(
            "Approved By",
            e.approved_by_name.as_deref().unwrap_or("Your Manager"),
        )
        .with_detail("Comments", e.comments.as_deref().unwrap_or("None"))
        .with_action(self.link("my-leaves"), "View Leave Details");
        context.notification_title = Some("Leave Approved".to_string());

        OutboundEmail::notification(&e.employee_email, NotificationType::LeaveApproved, context)
    }

    fn leave_rejected(&self, e: &LeaveRejected) -> OutboundEmail {
        let mut context = NotificationContext::new(
            &e.employee_name,
            "Leave Request Not Approved",
            format!(
                "Unfortunately, your {} leave request was not approved. Please contact your \
                 manager if you have questions.",
                e.leave_type
            ),
        )
        .with_detail("Leave Type", &e.leave_type)
        .with_detail("Start Date", e.start_date.to_string())
        .with_detail("End Date", e.end_date.to_string())
        .with_detail("Days Requested", e.days_requested.to_string())
        .with_detail("Reason for Rejection", &e.rejection_reason)
        .with_detail(
            "Rejected By",
            e.rejected_by_name.as_deref().unwrap_or("Your Manager"),
        )
        .with_action(self.link("my-leaves"), "View Details");
        context.notification_title = Some("Leave Request Update".to_string());

        OutboundEmail::notification(&e.employee_email, NotificationType::LeaveRejected, context)
    }
}

fn employee_created(e: &EmployeeCreated) -> OutboundEmail {
    let context = NotificationContext::new(
        e.employee.full_name(),
        "Employee Profile Created",
        format!(
            "Your employee profile has been successfully created. Welcome to {}!",
            e.department.as_deref().unwrap_or("the team")
        ),
    )
    .with_detail("Employee ID", e.employee.employee_id.to_string())
    .with_detail("Role", &e.role)
    .with_detail("Job Title", &e.job_title)
    .with_detail("Department", e.department.as_deref().unwrap_or("Not Assigned"));

    OutboundEmail::notification(&e.employee.email, NotificationType::Notification, context)
}

fn employee_promoted(e: &EmployeePromoted) -> OutboundEmail {
    let name = e.employee.full_name();
    let context = CongratulationsContext::new(
        &name,
        "Congratulations on your well-deserved promotion! Your hard work and dedication have \
         been recognized.",
    )
    .with_achievement(format!("Promoted to {}", e.new_job_title))
    .with_detail("Previous Position", &e.old_job_title)
    .with_detail("New Position", &e.new_job_title)
    .with_detail("Effective Date", e.effective_date.to_string())
    .with_closing_message(
        "We're excited to see you take on new challenges and continue to excel in your \
         career. Best wishes for continued success!",
    );

    OutboundEmail::new(
        &e.employee.email,
        name,
        "Congratulations on Your Promotion!",
        NotificationType::Promotion,
        context,
    )
}

fn salary_increment(e: &SalaryIncrement) -> OutboundEmail {
    let name = e.employee.full_name();
    let context = CongratulationsContext::new(
        &name,
        "We're pleased to inform you of your salary increment! This reflects your valuable \
         contributions to the organization.",
    )
    .with_achievement(format!("{:.1}% Salary Increment", e.increment_percentage))
    .with_detail(
        "New Salary",
        format!("{} {}", e.salary_currency, format_amount(e.new_salary)),
    )
    .with_detail("Effective Date", e.effective_date.to_string())
    .with_detail("Years of Service", e.years_of_service.to_string())
    .with_closing_message("Thank you for your continued dedication and hard work!");

    OutboundEmail::new(
        &e.employee.email,
        name,
        "Congratulations on Your Salary Increment!",
        NotificationType::SalaryIncrement,
        context,
    )
}

fn birthday(e: &Birthday) -> OutboundEmail {
    let name = e.employee.full_name();
    let context = CongratulationsContext::new(
        &name,
        "Wishing you a wonderful birthday filled with joy and happiness!",
    )
    .with_achievement("Happy Birthday!")
    .with_detail("Department", e.department.as_deref().unwrap_or("Our Team"))
    .with_closing_message(
        "May this year bring you great success, happiness, and prosperity. Enjoy your special \
         day!",
    );

    OutboundEmail::new(
        &e.employee.email,
        name,
        "Happy Birthday!",
        NotificationType::Birthday,
        context,
    )
}

fn work_anniversary(e: &WorkAnniversary) -> OutboundEmail {
    let name = e.employee.full_name();
    let years = e.years_of_service;
    let (year_word, year_title) = if years == 1 {
        ("year", "Year")
    } else {
        ("years", "Years")
    };

    let context = CongratulationsContext::new(
        &name,
        format!(
            "Congratulations on your {} {} work anniversary! Thank you for being an invaluable \
             part of our team.",
            years, year_word
        ),
    )
    .with_achievement(format!("{} {} of Service", years, year_title))
    .with_detail("Joined", e.joining_date.to_string())
    .with_detail("Department", e.department.as_deref().unwrap_or("Our Team"))
    .with_detail("Years of Service", years.to_string())
    .with_closing_message(
        "Your dedication and contributions have made a significant impact. Here's to many more \
         successful years together!",
    );

    OutboundEmail::new(
        &e.employee.email,
        name,
        format!("Happy {} Year Work Anniversary!", years),
        NotificationType::WorkAnniversary,
        context,
    )
}

fn late_arrival(e: &LateArrival) -> Option<OutboundEmail> {
    let manager_email = e.manager_email.as_ref()?;
    let mut context = NotificationContext::new(
        MANAGER,
        "Late Arrival Notification",
        format!(
            "{} arrived {} minutes late today.",
            e.employee_name, e.minutes_late
        ),
    )
    .with_detail("Employee", &e.employee_name)
    .with_detail("Check-in Time", e.check_in_time.to_string())
    .with_detail("Expected Time", e.expected_time.to_string())
    .with_detail("Minutes Late", e.minutes_late.to_string());
    context.notification_title = Some("Attendance Alert".to_string());

    Some(OutboundEmail::notification(
        manager_email,
        NotificationType::LateArrival,
        context,
    ))
}

fn absent_employee(e: &AbsentEmployee) -> Option<OutboundEmail> {
    let manager_email = e.manager_email.as_ref()?;
    let mut context = NotificationContext::new(
        MANAGER,
        "Employee Absence Alert",
        format!(
            "{} was absent on {}. This is consecutive absence #{}.",
            e.employee_name, e.absent_date, e.consecutive_absences
        ),
    )
    .with_detail("Employee", &e.employee_name)
    .with_detail("Email", &e.employee_email)
    .with_detail("Absent Date", e.absent_date.to_string())
    .with_detail("Consecutive Absences", e.consecutive_absences.to_string());
    context.notification_title = Some("Absence Notification".to_string());

    Some(OutboundEmail::notification(
        manager_email,
        NotificationType::Absent,
        context,
    ))
}

fn overtime_alert(e: &OvertimeAlert) -> Option<OutboundEmail> {
    let manager_email = e.manager_email.as_ref()?;
    let mut context = NotificationContext::new(
        MANAGER,
        "Overtime Alert",
        format!(
            "{} worked {:.1} hours of overtime today.",
            e.employee_name, e.overtime_hours
        ),
    )
    .with_detail("Employee", &e.employee_name)
    .with_detail("Check-out Time", e.check_out_time.to_string())
    .with_detail("Overtime Hours", format!("{:.1}", e.overtime_hours));
    context.notification_title = Some("Overtime Notification".to_string());

    Some(OutboundEmail::notification(
        manager_email,
        NotificationType::OvertimeAlert,
        context,
    ))
}

fn urgency_within(days_remaining: i64, threshold: i64) -> Urgency {
    if days_remaining <= threshold {
        Urgency::High
    } else {
        Urgency::Medium
    }
}

/// `85000.0` -> `85,000.00`
fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

/// Summary logged for events that produce no email
pub fn salary_increment_due_summary(e: &SalaryIncrementDue) -> String {
    format!(
        "Salary increment due for {} on {}: {} years of service, current salary {} {}",
        e.employee.full_name(),
        e.increment_due_date,
        e.years_of_service,
        e.salary_currency,
        format_amount(e.current_salary)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn composer() -> Composer {
        Composer::new("https://hrms.example.com/", "Acme HR")
    }

    fn employee() -> EmployeeRef {
        EmployeeRef {
            employee_id: 42,
            user_id: Some(7),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn details(context: &EmailContext) -> Vec<(String, String)> {
        let details = match context {
            EmailContext::Notification(ctx) => &ctx.details,
            EmailContext::Reminder(ctx) => &ctx.details,
            EmailContext::Congratulations(ctx) => &ctx.details,
            EmailContext::Welcome(_) => return Vec::new(),
        };
        details
            .iter()
            .map(|d| (d.label.clone(), d.value.clone()))
            .collect()
    }

    #[test]
    fn test_links_are_built_from_base_url() {
        assert_eq!(composer().link("/my-leaves"), "https://hrms.example.com/my-leaves");
        assert_eq!(composer().link("login"), "https://hrms.example.com/login");
    }

    #[test]
    fn test_invitation_reminder() {
        let event = HrEvent::Invitation(OnboardingInvitation {
            email: "new@example.com".to_string(),
            role: "employee".to_string(),
            job_title: Some("Analyst".to_string()),
            invitation_link: "https://hrms.example.com/invite/t0k3n".to_string(),
            expires_at: Some(Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()),
        });

        let emails = composer().compose(&event);
        assert_eq!(emails.len(), 1);
        let email = &emails[0];
        assert_eq!(email.subject, "You're Invited to Join Our Team!");
        assert_eq!(email.notification_type, NotificationType::Invitation);

        let EmailContext::Reminder(reminder) = &email.context else {
            panic!("expected a reminder");
        };
        assert_eq!(reminder.due_date.as_deref(), Some("2026-05-01"));
        assert_eq!(reminder.urgency, Some(Urgency::Medium));
        assert_eq!(reminder.action_text.as_deref(), Some("Complete Onboarding"));
        assert!(reminder.reminder_message.contains("as employee."));
        assert!(email.context.validate().is_ok());
    }

    #[test]
    fn test_onboarding_completed_defaults_to_login_link() {
        let event = HrEvent::OnboardingCompleted(OnboardingCompleted {
            onboarding_id: "ob-1".to_string(),
            user_id: "u-1".to_string(),
            employee_id: Some(42),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: "employee".to_string(),
            job_title: None,
            department: Some("Engineering".to_string()),
            start_date: Some("2026-04-01".to_string()),
            login_url: None,
        });

        let email = composer().compose(&event).remove(0);
        assert_eq!(email.subject, "Welcome to Acme HR!");
        let EmailContext::Welcome(welcome) = &email.context else {
            panic!("expected a welcome");
        };
        assert_eq!(welcome.role.as_deref(), Some("employee"));
        assert_eq!(welcome.employee_id.as_deref(), Some("42"));
        assert_eq!(
            welcome.action_url.as_deref(),
            Some("https://hrms.example.com/login")
        );
    }

    #[test]
    fn test_probation_ending_with_and_without_manager() {
        let mut probation = ProbationEnding {
            employee: employee(),
            probation_end_date: date(2026, 6, 30),
            days_remaining: 5,
            manager_id: Some(3),
            manager_email: Some("boss@example.com".to_string()),
        };

        let emails = composer().compose(&HrEvent::ProbationEnding(probation.clone()));
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].recipient_email, "boss@example.com");
        assert_eq!(emails[0].subject, "Probation Ending: Jane Doe");
        let EmailContext::Reminder(reminder) = &emails[0].context else {
            panic!("expected a reminder");
        };
        assert_eq!(reminder.urgency, Some(Urgency::High));
        assert_eq!(emails[1].recipient_email, "jane@example.com");
        assert_eq!(emails[1].subject, "Probation Period Update");

        probation.manager_email = None;
        probation.days_remaining = 20;
        let emails = composer().compose(&HrEvent::ProbationEnding(probation));
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].recipient_email, "jane@example.com");
    }

    #[test]
    fn test_contract_urgency_threshold() {
        assert_eq!(urgency_within(14, 14), Urgency::High);
        assert_eq!(urgency_within(15, 14), Urgency::Medium);
    }

    #[test]
    fn test_leave_approved_details() {
        let event = HrEvent::LeaveApproved(LeaveApproved {
            leave_id: 9,
            employee_id: 42,
            employee_email: "jane@example.com".to_string(),
            employee_name: "Jane Doe".to_string(),
            approved_by_id: 3,
            approved_by_email: None,
            approved_by_name: None,
            leave_type: "annual".to_string(),
            start_date: date(2026, 7, 1),
            end_date: date(2026, 7, 3),
            days_approved: 3,
            comments: None,
        });

        let email = composer().compose(&event).remove(0);
        assert_eq!(email.subject, "Leave Request Approved");
        assert_eq!(email.recipient_name, "Jane Doe");
        assert_eq!(email.notification_type, NotificationType::LeaveApproved);
        assert_eq!(
            details(&email.context),
            vec![
                ("Leave Type".to_string(), "annual".to_string()),
                ("Start Date".to_string(), "2026-07-01".to_string()),
                ("End Date".to_string(), "2026-07-03".to_string()),
                ("Days Approved".to_string(), "3".to_string()),
                ("Approved By".to_string(), "Your Manager".to_string()),
                ("Comments".to_string(), "None".to_string()),
            ]
        );
    }

    #[test]
    fn test_manager_only_events_need_a_manager() {
        let late = LateArrival {
            attendance_id: 1,
            employee_id: 42,
            employee_email: "jane@example.com".to_string(),
            employee_name: "Jane Doe".to_string(),
            check_in_time: Utc.with_ymd_and_hms(2026, 3, 2, 9, 25, 0).unwrap(),
            expected_time: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
            minutes_late: 25,
            manager_id: None,
            manager_email: None,
        };
        assert!(composer().compose(&HrEvent::LateArrival(late.clone())).is_empty());

        let with_manager = LateArrival {
            manager_email: Some("boss@example.com".to_string()),
            ..late
        };
        let emails = composer().compose(&HrEvent::LateArrival(with_manager));
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].recipient_name, "Manager");
        assert_eq!(emails[0].subject, "Late Arrival Notification");
    }

    #[test]
    fn test_salary_increment_due_sends_nothing() {
        let due = SalaryIncrementDue {
            employee: employee(),
            increment_due_date: date(2026, 9, 1),
            years_of_service: 3,
            current_salary: 85000.0,
            salary_currency: "USD".to_string(),
            manager_id: None,
        };
        assert!(composer().compose(&HrEvent::SalaryIncrementDue(due.clone())).is_empty());
        assert!(salary_increment_due_summary(&due).contains("USD 85,000.00"));
    }

    #[test]
    fn test_salary_increment_amounts() {
        let event = HrEvent::SalaryIncrement(SalaryIncrement {
            employee: employee(),
            old_salary: 100000.0,
            new_salary: 1234567.891,
            increment_percentage: 12.345,
            salary_currency: "EUR".to_string(),
            effective_date: date(2026, 1, 1),
            years_of_service: 4,
        });

        let email = composer().compose(&event).remove(0);
        let EmailContext::Congratulations(ctx) = &email.context else {
            panic!("expected congratulations");
        };
        assert_eq!(ctx.achievement.as_deref(), Some("12.3% Salary Increment"));
        assert_eq!(ctx.details[0].value, "EUR 1,234,567.89");
    }

    #[test]
    fn test_work_anniversary_wording() {
        let mut anniversary = WorkAnniversary {
            employee: employee(),
            joining_date: date(2025, 4, 1),
            years_of_service: 1,
            department: None,
        };

        let email = composer().compose(&HrEvent::WorkAnniversary(anniversary.clone())).remove(0);
        assert_eq!(email.subject, "Happy 1 Year Work Anniversary!");
        let EmailContext::Congratulations(ctx) = &email.context else {
            panic!("expected congratulations");
        };
        assert_eq!(ctx.achievement.as_deref(), Some("1 Year of Service"));
        assert!(ctx.message.contains("your 1 year work anniversary"));

        anniversary.years_of_service = 5;
        let email = composer().compose(&HrEvent::WorkAnniversary(anniversary)).remove(0);
        let EmailContext::Congratulations(ctx) = &email.context else {
            panic!("expected congratulations");
        };
        assert_eq!(ctx.achievement.as_deref(), Some("5 Years of Service"));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(85000.0), "85,000.00");
        assert_eq!(format_amount(950.5), "950.50");
        assert_eq!(format_amount(-1200.0), "-1,200.00");
    }
}
