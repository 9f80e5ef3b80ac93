//! Scholarship service models.
//!
//! Database rows, request bodies and response bodies shared by handlers,
//! services and repositories.

use chrono::{DateTime, NaiveDate, Utc};
use common::secret::{ExposeSecret, SecretString};
use common::types::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in characters (bcrypt truncates at 72 bytes).
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Maximum length of display names, titles and similar short text fields.
pub const MAX_NAME_LENGTH: usize = 255;

/// Shortest accepted interview slot.
pub const MIN_SLOT_MINUTES: i32 = 5;

/// Longest accepted interview slot.
pub const MAX_SLOT_MINUTES: i32 = 240;

/// Upper bound on slots generated for a single interview.
pub const MAX_SLOTS_PER_INTERVIEW: usize = 100;

/// Earliest accepted batch (angkatan) year.
pub const MIN_BATCH_YEAR: i32 = 2000;

/// Latest accepted batch (angkatan) year.
pub const MAX_BATCH_YEAR: i32 = 2100;

/// Content types accepted for uploaded documents.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

fn require_text(value: &str, field: &'static str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("{field} must be at most {MAX_NAME_LENGTH} characters"));
    }
    Ok(())
}

fn validate_password(password: &SecretString) -> Result<(), String> {
    let len = password.expose_secret().chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Basic `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

// ============================================================================
// Users and sessions
// ============================================================================

/// Row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Active session joined with its user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionUserRow {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserRow {
    /// Parse the stored role text.
    pub fn role(&self) -> Result<Role, common::types::InvalidRole> {
        Role::from_str(&self.role)
    }

    /// Convert to the public representation.
    pub fn to_response(&self) -> Result<UserResponse, common::types::InvalidRole> {
        Ok(UserResponse {
            user_id: self.user_id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role()?,
            is_active: self.is_active,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
        })
    }
}

/// Self-registration request. New accounts start as `guest`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: SecretString,
    pub display_name: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_email(self.email.trim()) {
            return Err("Invalid email address".to_string());
        }
        validate_password(&self.password)?;
        require_text(&self.display_name, "Display name")
    }
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
}

/// Login response.
///
/// The token is also set as the `sc_session` cookie.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

/// Response for `GET /api/v1/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentRow>,
}

/// Admin request to create a staff (or any) account.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: SecretString,
    pub display_name: String,
    pub role: Role,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_email(self.email.trim()) {
            return Err("Invalid email address".to_string());
        }
        validate_password(&self.password)?;
        require_text(&self.display_name, "Display name")
    }
}

/// Admin request to change a user's role or activation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Query parameters for `GET /api/v1/users`.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}

// ============================================================================
// Periods
// ============================================================================

/// Row from the `periods` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PeriodRow {
    pub period_id: Uuid,
    pub name: String,
    pub academic_year: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub is_current: bool,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePeriodRequest {
    pub name: String,
    pub academic_year: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    #[serde(default)]
    pub is_open: bool,
}

impl CreatePeriodRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.name, "Name")?;
        require_text(&self.academic_year, "Academic year")?;
        if self.ends_on < self.starts_on {
            return Err("End date must not be before start date".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePeriodRequest {
    pub name: Option<String>,
    pub academic_year: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub is_open: Option<bool>,
}

impl UpdatePeriodRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text(name, "Name")?;
        }
        if let Some(year) = &self.academic_year {
            require_text(year, "Academic year")?;
        }
        Ok(())
    }
}

// ============================================================================
// Students and status
// ============================================================================

/// Row from the `students` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StudentRow {
    pub student_id: Uuid,
    pub user_id: Uuid,
    pub student_number: String,
    pub full_name: String,
    pub faculty: String,
    pub major: String,
    pub batch_year: i32,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create or update the caller's student profile.
#[derive(Debug, Deserialize)]
pub struct UpsertStudentRequest {
    pub student_number: String,
    pub full_name: String,
    pub faculty: String,
    pub major: String,
    pub batch_year: i32,
    pub phone: Option<String>,
}

impl UpsertStudentRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.student_number, "Student number")?;
        require_text(&self.full_name, "Full name")?;
        require_text(&self.faculty, "Faculty")?;
        require_text(&self.major, "Major")?;
        if !(MIN_BATCH_YEAR..=MAX_BATCH_YEAR).contains(&self.batch_year) {
            return Err(format!(
                "Batch year must be between {MIN_BATCH_YEAR} and {MAX_BATCH_YEAR}"
            ));
        }
        Ok(())
    }
}

/// Row from the `statuses` table: one per student per period.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusRow {
    pub status_id: Uuid,
    pub student_id: Uuid,
    pub period_id: Uuid,
    pub document_passed: Option<bool>,
    pub interview_passed: Option<bool>,
    pub final_passed: Option<bool>,
    pub aid_amount: Option<i64>,
    pub reviewer_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response for `GET /api/v1/students/me/status`.
#[derive(Debug, Serialize)]
pub struct MyStatusResponse {
    pub period: PeriodRow,
    pub status: StatusRow,
}

/// A registered student joined with their status for one period.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PeriodStudentRow {
    pub student_id: Uuid,
    pub student_number: String,
    pub full_name: String,
    pub faculty: String,
    pub major: String,
    pub batch_year: i32,
    pub document_passed: Option<bool>,
    pub interview_passed: Option<bool>,
    pub final_passed: Option<bool>,
    pub aid_amount: Option<i64>,
    pub registered_at: DateTime<Utc>,
}

/// Filters for `GET /api/v1/periods/:period_id/students`.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodStudentsQuery {
    pub faculty: Option<String>,
    pub document_passed: Option<bool>,
    pub interview_passed: Option<bool>,
    pub final_passed: Option<bool>,
}

/// Response for `GET /api/v1/students/:student_id`.
#[derive(Debug, Serialize)]
pub struct StudentDetailResponse {
    pub student: StudentRow,
    pub statuses: Vec<StatusRow>,
}

/// Staff update of a student's per-period status.
///
/// Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub document_passed: Option<bool>,
    pub interview_passed: Option<bool>,
    pub final_passed: Option<bool>,
    pub aid_amount: Option<i64>,
    pub reviewer_note: Option<String>,
}

impl UpdateStatusRequest {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(self.aid_amount, Some(amount) if amount < 0) {
            return Err("Aid amount must not be negative".to_string());
        }
        if self.final_passed == Some(false) && matches!(self.aid_amount, Some(amount) if amount > 0)
        {
            return Err("Aid amount cannot be set for a rejected applicant".to_string());
        }
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        self.document_passed.is_some()
            || self.interview_passed.is_some()
            || self.final_passed.is_some()
            || self.aid_amount.is_some()
            || self.reviewer_note.is_some()
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Kind of supporting document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Student identity card.
    Ktm,
    /// Academic transcript.
    Transkrip,
    /// Family card.
    Kk,
    /// Parent salary slip.
    SlipGaji,
    /// Recommendation letter.
    SuratRekomendasi,
    /// Photo.
    Foto,
    /// Anything else.
    Lainnya,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Ktm => "ktm",
            DocumentKind::Transkrip => "transkrip",
            DocumentKind::Kk => "kk",
            DocumentKind::SlipGaji => "slip_gaji",
            DocumentKind::SuratRekomendasi => "surat_rekomendasi",
            DocumentKind::Foto => "foto",
            DocumentKind::Lainnya => "lainnya",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File extension for an allowed content type.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "application/pdf" => Some("pdf"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

/// Row from the `files` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FileRow {
    pub file_id: Uuid,
    pub student_id: Uuid,
    pub period_id: Uuid,
    pub kind: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Query parameters for `POST /api/v1/students/me/files`.
///
/// The body is the raw file content; its type comes from `Content-Type`.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub kind: DocumentKind,
    pub filename: String,
}

impl UploadQuery {
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.filename, "Filename")?;
        if self.filename.contains(['/', '\\']) {
            return Err("Filename must not contain path separators".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Interviews
// ============================================================================

/// Row from the `interviews` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InterviewRow {
    pub interview_id: Uuid,
    pub period_id: Uuid,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub slot_minutes: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Interview with slot counts, for listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InterviewSummaryRow {
    pub interview_id: Uuid,
    pub period_id: Uuid,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub slot_minutes: i32,
    pub slot_count: i64,
    pub booked_count: i64,
}

/// Row from `interview_slots` joined with the booking student's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlotRow {
    pub slot_id: Uuid,
    pub interview_id: Uuid,
    pub period_id: Uuid,
    pub slot_number: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub student_id: Option<Uuid>,
    pub booked_at: Option<DateTime<Utc>>,
    pub student_name: Option<String>,
}

/// A generated slot before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSlot {
    pub slot_number: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Slot as returned to clients.
///
/// Booking identity is omitted when the viewer may not see it.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub slot_number: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_booked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_at: Option<DateTime<Utc>>,
}

impl SlotView {
    /// Full view including who booked the slot.
    pub fn full(slot: &SlotRow) -> Self {
        Self {
            slot_number: slot.slot_number,
            starts_at: slot.starts_at,
            ends_at: slot.ends_at,
            is_booked: slot.student_id.is_some(),
            student_id: slot.student_id,
            student_name: slot.student_name.clone(),
            booked_at: slot.booked_at,
        }
    }

    /// View for an applicant: identity only shown for their own booking.
    pub fn for_student(slot: &SlotRow, viewer: Option<Uuid>) -> Self {
        let own = viewer.is_some() && slot.student_id == viewer;
        if own {
            return Self::full(slot);
        }
        Self {
            slot_number: slot.slot_number,
            starts_at: slot.starts_at,
            ends_at: slot.ends_at,
            is_booked: slot.student_id.is_some(),
            student_id: None,
            student_name: None,
            booked_at: None,
        }
    }
}

/// Interview participant (interviewer) joined with user details.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ParticipantRow {
    pub user_id: Uuid,
    pub display_name: String,
    pub role: String,
    pub added_at: DateTime<Utc>,
}

/// Response for `GET /api/v1/interviews/:interview_id`.
#[derive(Debug, Serialize)]
pub struct InterviewDetailResponse {
    pub interview: InterviewRow,
    pub slots: Vec<SlotView>,
    pub participants: Vec<ParticipantRow>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub slot_minutes: i32,
}

impl CreateInterviewRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.title, "Title")?;
        require_text(&self.location, "Location")
    }
}

/// Query parameters for `GET /api/v1/interviews`.
#[derive(Debug, Default, Deserialize)]
pub struct ListInterviewsQuery {
    pub period_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    pub user_id: Uuid,
}

/// A student's booking with the interview it belongs to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingRow {
    pub interview_id: Uuid,
    pub title: String,
    pub location: String,
    pub slot_number: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub booked_at: DateTime<Utc>,
}

/// Row from `interview_notes` joined with the author name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NoteRow {
    pub note_id: Uuid,
    pub interview_id: Uuid,
    pub student_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertNoteRequest {
    pub content: String,
}

// ============================================================================
// Scoring
// ============================================================================

/// Row from the `questions` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuestionRow {
    pub question_id: Uuid,
    pub period_id: Uuid,
    pub position: i32,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create or edit a rubric question.
#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub prompt: String,
}

impl QuestionRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.prompt.trim().is_empty() {
            return Err("Prompt is required");
        }
        Ok(())
    }
}

/// Rubric answer category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Kurang,
    Cukup,
    Baik,
    SangatBaik,
}

/// Points awarded for the best category.
pub const MAX_POINTS_PER_QUESTION: i64 = 4;

impl ScoreCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreCategory::Kurang => "kurang",
            ScoreCategory::Cukup => "cukup",
            ScoreCategory::Baik => "baik",
            ScoreCategory::SangatBaik => "sangat_baik",
        }
    }

    pub fn points(&self) -> i64 {
        match self {
            ScoreCategory::Kurang => 1,
            ScoreCategory::Cukup => 2,
            ScoreCategory::Baik => 3,
            ScoreCategory::SangatBaik => 4,
        }
    }
}

impl FromStr for ScoreCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kurang" => Ok(ScoreCategory::Kurang),
            "cukup" => Ok(ScoreCategory::Cukup),
            "baik" => Ok(ScoreCategory::Baik),
            "sangat_baik" => Ok(ScoreCategory::SangatBaik),
            other => Err(format!("Unknown score category: {other}")),
        }
    }
}

/// One answer in a score submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreEntryInput {
    pub question_id: Uuid,
    pub category: ScoreCategory,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitScoresRequest {
    pub entries: Vec<ScoreEntryInput>,
    pub aid_amount: Option<i64>,
}

impl SubmitScoresRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if matches!(self.aid_amount, Some(amount) if amount < 0) {
            return Err("Aid amount must not be negative");
        }
        let mut seen = std::collections::HashSet::new();
        if !self.entries.iter().all(|e| seen.insert(e.question_id)) {
            return Err("Each question may only be scored once per submission");
        }
        Ok(())
    }
}

/// Question joined with a student's answer, if any.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoreMatrixRow {
    pub question_id: Uuid,
    pub position: i32,
    pub prompt: String,
    pub category: Option<String>,
    pub comment: Option<String>,
    pub scored_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreMatrixEntry {
    pub question_id: Uuid,
    pub position: i32,
    pub prompt: String,
    pub category: Option<ScoreCategory>,
    pub points: Option<i64>,
    pub comment: Option<String>,
    pub scored_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Response for the score matrix of one student in one period.
#[derive(Debug, Serialize)]
pub struct ScoreMatrixResponse {
    pub period_id: Uuid,
    pub student_id: Uuid,
    pub entries: Vec<ScoreMatrixEntry>,
    pub total_points: i64,
    pub max_points: i64,
    pub aid_amount: Option<i64>,
}

// ============================================================================
// Notifications and reports
// ============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// Aggregate counters for a period.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct PeriodTotalsRow {
    pub registered: i64,
    pub with_documents: i64,
    pub document_passed: i64,
    pub document_failed: i64,
    pub interviews_booked: i64,
    pub interview_passed: i64,
    pub interview_failed: i64,
    pub final_approved: i64,
    pub final_rejected: i64,
    pub total_aid: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FacultyStatisticsRow {
    pub faculty: String,
    pub registered: i64,
    pub approved: i64,
    pub total_aid: i64,
}

/// Response for `GET /api/v1/periods/:period_id/statistics`.
#[derive(Debug, Serialize)]
pub struct PeriodStatisticsResponse {
    pub period_id: Uuid,
    #[serde(flatten)]
    pub totals: PeriodTotalsRow,
    pub by_faculty: Vec<FacultyStatisticsRow>,
}

/// Readiness check response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("siti@kampus.ac.id"));
        assert!(is_valid_email("a.b+c@example.com"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@.c"));
        assert!(!is_valid_email("user@a@b.com"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "budi@example.com".to_string(),
            password: SecretString::from("rahasia123"),
            display_name: "Budi".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short = RegisterRequest {
            password: SecretString::from("pendek"),
            ..ok
        };
        assert!(short.validate().unwrap_err().contains("at least"));
    }

    #[test]
    fn test_register_request_debug_redacts_password() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@example.com","password":"super-secret-pw","display_name":"A"}"#,
        )
        .unwrap();
        let debug = format!("{:?}", request);
        assert!(!debug.contains("super-secret-pw"));
    }

    #[test]
    fn test_student_batch_year_bounds() {
        let mut request = UpsertStudentRequest {
            student_number: "2021001".to_string(),
            full_name: "Siti Aminah".to_string(),
            faculty: "Teknik".to_string(),
            major: "Informatika".to_string(),
            batch_year: 2021,
            phone: None,
        };
        assert!(request.validate().is_ok());

        request.batch_year = 1999;
        assert!(request.validate().is_err());
        request.batch_year = 2101;
        assert!(request.validate().is_err());
        request.batch_year = 2100;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_period_request_dates() {
        let request: CreatePeriodRequest = serde_json::from_str(
            r#"{"name":"2025 Ganjil","academic_year":"2025/2026","starts_on":"2025-09-01","ends_on":"2025-08-01"}"#,
        )
        .unwrap();
        assert!(!request.is_open);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_status_update_validation() {
        let negative = UpdateStatusRequest {
            aid_amount: Some(-1),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let rejected_with_aid = UpdateStatusRequest {
            final_passed: Some(false),
            aid_amount: Some(500_000),
            ..Default::default()
        };
        assert!(rejected_with_aid.validate().is_err());

        assert!(!UpdateStatusRequest::default().has_changes());
    }

    #[test]
    fn test_document_kind_serde() {
        let kind: DocumentKind = serde_json::from_str("\"slip_gaji\"").unwrap();
        assert_eq!(kind, DocumentKind::SlipGaji);
        assert_eq!(kind.as_str(), "slip_gaji");
        assert!(serde_json::from_str::<DocumentKind>("\"ijazah\"").is_err());
    }

    #[test]
    fn test_content_type_extensions() {
        assert_eq!(extension_for_content_type("application/pdf"), Some("pdf"));
        assert_eq!(extension_for_content_type("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_content_type("image/png"), Some("png"));
        assert_eq!(extension_for_content_type("text/html"), None);
        for content_type in ALLOWED_CONTENT_TYPES {
            assert!(extension_for_content_type(content_type).is_some());
        }
    }

    #[test]
    fn test_upload_filename_rejects_separators() {
        let query = UploadQuery {
            kind: DocumentKind::Ktm,
            filename: "../etc/passwd".to_string(),
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_score_category_points() {
        assert_eq!(ScoreCategory::Kurang.points(), 1);
        assert_eq!(ScoreCategory::Cukup.points(), 2);
        assert_eq!(ScoreCategory::Baik.points(), 3);
        assert_eq!(ScoreCategory::SangatBaik.points(), MAX_POINTS_PER_QUESTION);
        assert_eq!(
            ScoreCategory::from_str("sangat_baik"),
            Ok(ScoreCategory::SangatBaik)
        );
        assert!(ScoreCategory::from_str("luar_biasa").is_err());
    }

    #[test]
    fn test_submit_scores_rejects_duplicate_questions() {
        let id = Uuid::new_v4();
        let request = SubmitScoresRequest {
            entries: vec![
                ScoreEntryInput {
                    question_id: id,
                    category: ScoreCategory::Baik,
                    comment: None,
                },
                ScoreEntryInput {
                    question_id: id,
                    category: ScoreCategory::Cukup,
                    comment: None,
                },
            ],
            aid_amount: None,
        };
        assert!(request.validate().is_err());
    }

    fn slot(student_id: Option<Uuid>) -> SlotRow {
        let now = Utc::now();
        SlotRow {
            slot_id: Uuid::new_v4(),
            interview_id: Uuid::new_v4(),
            period_id: Uuid::new_v4(),
            slot_number: 1,
            starts_at: now,
            ends_at: now,
            student_id,
            booked_at: student_id.map(|_| now),
            student_name: student_id.map(|_| "Siti".to_string()),
        }
    }

    #[test]
    fn test_slot_view_hides_other_students() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let booked = slot(Some(owner));

        let hidden = SlotView::for_student(&booked, Some(other));
        assert!(hidden.is_booked);
        assert!(hidden.student_id.is_none());
        assert!(hidden.student_name.is_none());

        let own = SlotView::for_student(&booked, Some(owner));
        assert_eq!(own.student_id, Some(owner));

        let free = SlotView::for_student(&slot(None), None);
        assert!(!free.is_booked);
    }
}
