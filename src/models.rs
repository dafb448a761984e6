use serde::Serialize;
use uuid::Uuid;

use crate::grade::Letter;

/// One score row fetched from the store, joined through its assignment to the
/// subject and the teacher who owns it.
#[derive(Debug, Clone)]
pub struct ScoreRecord {
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub teacher_name: String,
    pub value: f64,
}

/// A cohort roster entry. Students appear here whether or not they have any
/// scores for the term.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub student_id: Uuid,
    pub admission_number: String,
    pub fullname: String,
    pub class_name: String,
    pub stream_name: String,
    pub guardian_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectResult {
    pub subject_id: Uuid,
    pub subject_name: String,
    pub score: f64,
    pub grade: Letter,
    pub teacher: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAggregate {
    pub student_id: Uuid,
    pub admission_number: String,
    pub fullname: String,
    pub class_name: String,
    pub stream_name: String,
    pub term_name: String,
    pub academic_year: String,
    pub total_score: f64,
    pub subject_count: usize,
    pub average_score: f64,
    pub overall_grade: Letter,
    pub subject_results: Vec<SubjectResult>,
}

impl StudentAggregate {
    /// Distinguishes "never scored" from "scored zero": an aggregate with no
    /// subject rows averages 0 but has no scores.
    pub fn has_scores(&self) -> bool {
        self.subject_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAggregate {
    #[serde(flatten)]
    pub aggregate: StudentAggregate,
    pub class_rank: usize,
    pub stream_rank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentCategory {
    Academic,
    Behavioral,
    General,
    Recommendation,
}

impl CommentCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "academic" => Some(CommentCategory::Academic),
            "behavioral" => Some(CommentCategory::Behavioral),
            "general" => Some(CommentCategory::General),
            "recommendation" => Some(CommentCategory::Recommendation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub category: CommentCategory,
    pub text: String,
}
