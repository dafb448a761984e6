use std::collections::HashMap;

use uuid::Uuid;

use crate::grade::subject_grade;
use crate::models::{RosterEntry, ScoreRecord, StudentAggregate, SubjectResult};

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Folds one student's score rows for a term into a [`StudentAggregate`].
///
/// An empty slice is not an error: it produces a zero-valued aggregate with
/// `subject_count == 0`, which callers tell apart from a genuine zero score
/// via [`StudentAggregate::has_scores`].
pub fn aggregate_student(
    student: &RosterEntry,
    term_name: &str,
    academic_year: &str,
    scores: &[ScoreRecord],
) -> StudentAggregate {
    let total_score: f64 = scores.iter().map(|record| record.value).sum();
    let subject_count = scores.len();
    let average_score = if subject_count > 0 {
        round2(total_score / subject_count as f64)
    } else {
        0.0
    };

    let subject_results = scores
        .iter()
        .map(|record| SubjectResult {
            subject_id: record.subject_id,
            subject_name: record.subject_name.clone(),
            score: record.value,
            grade: subject_grade(record.value),
            teacher: record.teacher_name.clone(),
        })
        .collect();

    StudentAggregate {
        student_id: student.student_id,
        admission_number: student.admission_number.clone(),
        fullname: student.fullname.clone(),
        class_name: student.class_name.clone(),
        stream_name: student.stream_name.clone(),
        term_name: term_name.to_string(),
        academic_year: academic_year.to_string(),
        total_score,
        subject_count,
        average_score,
        overall_grade: subject_grade(average_score),
        subject_results,
    }
}

/// Pairs a cohort roster with its score rows. Every roster entry yields an
/// aggregate; students without rows come out empty rather than missing.
pub fn aggregate_cohort(
    roster: &[RosterEntry],
    scores: &[ScoreRecord],
    term_name: &str,
    academic_year: &str,
) -> Vec<StudentAggregate> {
    let mut by_student: HashMap<Uuid, Vec<ScoreRecord>> = HashMap::new();
    for record in scores {
        by_student
            .entry(record.student_id)
            .or_default()
            .push(record.clone());
    }

    roster
        .iter()
        .map(|student| {
            let student_scores = by_student
                .get(&student.student_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            aggregate_student(student, term_name, academic_year, student_scores)
        })
        .collect()
}
