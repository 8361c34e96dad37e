// ********* Identifiers ***********

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::storage::StorageError;

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

/// Only unique within its parent question.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(pub String);

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteId(pub String);

impl Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for VoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ********* Entities ***********

/// The texts of the two options appended to every question.
/// They always stay at the end of the option list.
pub const PROTECTED_OPTIONS: [&str; 2] = ["No sé", "Ninguno"];

/// The form used for every email comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A person allowed to vote.
///
/// The email keeps the casing it was registered with. Lookups always go
/// through [normalize_email].
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Cached view of the votes: true once any vote exists for this email.
    #[serde(rename = "hasVoted")]
    pub has_voted: bool,
}

impl Participant {
    pub fn matches_email(&self, normalized_email: &str) -> bool {
        normalize_email(&self.email) == normalized_email
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyOption {
    pub id: OptionId,
    pub text: String,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: QuestionId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display order. Ends with the protected options.
    pub options: Vec<SurveyOption>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl SurveyQuestion {
    pub fn option(&self, option_id: &OptionId) -> Option<&SurveyOption> {
        self.options.iter().find(|o| o.id == *option_id)
    }

    /// True for the trailing "No sé" / "Ninguno" entries.
    pub fn is_protected(&self, option_id: &OptionId) -> bool {
        self.options
            .iter()
            .skip(self.insertion_index())
            .any(|o| o.id == *option_id && PROTECTED_OPTIONS.contains(&o.text.as_str()))
    }

    /// The position where new options are inserted.
    pub(crate) fn insertion_index(&self) -> usize {
        self.options.len().saturating_sub(PROTECTED_OPTIONS.len())
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    /// Always stored normalized.
    #[serde(rename = "participantEmail")]
    pub participant_email: String,
    #[serde(rename = "questionId")]
    pub question_id: QuestionId,
    #[serde(rename = "optionId")]
    pub option_id: OptionId,
    #[serde(rename = "votedAt")]
    pub voted_at: DateTime<Utc>,
}

/// The full persisted state of a survey.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub questions: Vec<SurveyQuestion>,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

/// Vote counters of one question, in option order.
pub type Tally = Vec<(OptionId, u64)>;

// ********* Voting flow **********

/// Where a participant stands when opening their voting link.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum VoterStatus {
    /// No email, or an email that is not registered.
    Invalid,
    AlreadyVoted,
    Eligible,
    /// A ballot has just been committed for this participant.
    Submitted,
}

impl Display for VoterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VoterStatus::Invalid => "INVALID",
            VoterStatus::AlreadyVoted => "ALREADY_VOTED",
            VoterStatus::Eligible => "ELIGIBLE",
            VoterStatus::Submitted => "SUBMITTED",
        };
        write!(f, "{}", s)
    }
}

// ********* Errors **********

/// Reasons for the store to refuse an operation.
///
/// A refused operation never changes the state of the store.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("The {field} field must not be empty"))]
    EmptyField { field: &'static str },

    #[snafu(display("A participant with email {email} is already registered"))]
    DuplicateEmail { email: String },

    #[snafu(display("No participant with id {id}"))]
    UnknownParticipant { id: ParticipantId },

    #[snafu(display("The question title must not be empty"))]
    EmptyTitle {},

    #[snafu(display("A question needs at least 2 options, {given} given"))]
    TooFewOptions { given: usize },

    #[snafu(display("No question with id {id}"))]
    UnknownQuestion { id: QuestionId },

    #[snafu(display("Question {question} has no option {option}"))]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },

    #[snafu(display("Option '{text}' of question {question} cannot be removed"))]
    ProtectedOption { question: QuestionId, text: String },

    #[snafu(display("The email {email} is not registered"))]
    NotRegistered { email: String },

    #[snafu(display("The participant {email} has already voted"))]
    AlreadyVoted { email: String },

    #[snafu(display("The survey has no questions to vote on"))]
    NoQuestions {},

    #[snafu(display("{} question(s) left unanswered", missing.len()))]
    IncompleteBallot { missing: Vec<QuestionId> },

    #[snafu(display("Could not persist the survey"))]
    Storage { source: StorageError },
}

impl StoreError {
    /// True for refusals caused by the caller's input, as opposed to storage failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, StoreError::Storage { .. })
    }
}
