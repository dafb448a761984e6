use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::round2;
use crate::grade::{self, subject_grade, Letter};
use crate::models::{CommentCategory, CommentRecord, RankedAggregate};

/// Comments collated by category. The single-valued categories resolve first
/// match wins; the plural ones keep submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportComments {
    pub recommendation: Option<String>,
    pub general: Option<String>,
    pub academic: Vec<String>,
    pub behavioral: Vec<String>,
}

pub fn collate_comments(comments: &[CommentRecord]) -> ReportComments {
    let mut collated = ReportComments::default();

    for comment in comments {
        match comment.category {
            CommentCategory::Recommendation => {
                if collated.recommendation.is_none() {
                    collated.recommendation = Some(comment.text.clone());
                }
            }
            CommentCategory::General => {
                if collated.general.is_none() {
                    collated.general = Some(comment.text.clone());
                }
            }
            CommentCategory::Academic => collated.academic.push(comment.text.clone()),
            CommentCategory::Behavioral => collated.behavioral.push(comment.text.clone()),
        }
    }

    collated
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualReport {
    pub student: RankedAggregate,
    pub comments: ReportComments,
    pub grade_distribution: BTreeMap<Letter, usize>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub remark: &'static str,
}

/// Composes one student's term report from their ranked aggregate and the
/// term's comments. Never mutates its inputs.
pub fn build_individual_report(
    ranked: &RankedAggregate,
    comments: &[CommentRecord],
) -> IndividualReport {
    let mut grade_distribution: BTreeMap<Letter, usize> = BTreeMap::new();
    for subject in &ranked.aggregate.subject_results {
        *grade_distribution.entry(subject.grade).or_insert(0) += 1;
    }

    let strengths = ranked
        .aggregate
        .subject_results
        .iter()
        .filter(|subject| subject.score >= 70.0)
        .map(|subject| subject.subject_name.clone())
        .collect();

    let areas_for_improvement = ranked
        .aggregate
        .subject_results
        .iter()
        .filter(|subject| subject.score < 50.0)
        .map(|subject| subject.subject_name.clone())
        .collect();

    IndividualReport {
        student: ranked.clone(),
        comments: collate_comments(comments),
        grade_distribution,
        strengths,
        areas_for_improvement,
        remark: grade::remark(ranked.aggregate.overall_grade),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSummary {
    pub total_students: usize,
    pub students_with_scores: usize,
    pub average_performance: f64,
    pub grade_distribution: BTreeMap<Letter, usize>,
}

/// Summarizes a ranked cohort. Students without scores count toward
/// `total_students` only; the mean and the grade distribution cover scored
/// students alone.
pub fn build_cohort_summary(ranked: &[RankedAggregate]) -> CohortSummary {
    let mut grade_distribution: BTreeMap<Letter, usize> = BTreeMap::new();
    let mut total_average = 0.0;
    let mut scored = 0usize;

    for entry in ranked {
        if !entry.aggregate.has_scores() {
            continue;
        }
        total_average += entry.aggregate.average_score;
        scored += 1;
        let grade = subject_grade(entry.aggregate.average_score);
        *grade_distribution.entry(grade).or_insert(0) += 1;
    }

    CohortSummary {
        total_students: ranked.len(),
        students_with_scores: scored,
        average_performance: if scored > 0 {
            round2(total_average / scored as f64)
        } else {
            0.0
        },
        grade_distribution,
    }
}

pub fn render_individual_markdown(
    report: &IndividualReport,
    school_name: &str,
    generated_on: NaiveDate,
) -> String {
    let student = &report.student;
    let aggregate = &student.aggregate;
    let mut output = String::new();

    let _ = writeln!(output, "# {}", school_name);
    let _ = writeln!(
        output,
        "Termly Result Slip for {} ({}), {} {}",
        aggregate.fullname, aggregate.admission_number, aggregate.class_name, aggregate.stream_name
    );
    let _ = writeln!(
        output,
        "{} {} (generated {})",
        aggregate.term_name, aggregate.academic_year, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance");
    let _ = writeln!(
        output,
        "- Total {:.1} across {} subjects, average {:.2} ({})",
        aggregate.total_score,
        aggregate.subject_count,
        aggregate.average_score,
        aggregate.overall_grade
    );
    let _ = writeln!(
        output,
        "- Class rank {}, stream rank {}",
        student.class_rank, student.stream_rank
    );
    let _ = writeln!(output, "- {}", report.remark);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");
    if aggregate.subject_results.is_empty() {
        let _ = writeln!(output, "No scores submitted for this term.");
    } else {
        for subject in &aggregate.subject_results {
            let _ = writeln!(
                output,
                "- {}: {:.1} ({}) by {}",
                subject.subject_name, subject.score, subject.grade, subject.teacher
            );
        }
    }

    if !report.strengths.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Strengths");
        for subject in &report.strengths {
            let _ = writeln!(output, "- {}", subject);
        }
    }

    if !report.areas_for_improvement.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Areas for Improvement");
        for subject in &report.areas_for_improvement {
            let _ = writeln!(output, "- {}", subject);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Comments");
    let mut wrote_comment = false;
    if let Some(text) = &report.comments.recommendation {
        let _ = writeln!(output, "- Principal: {}", text);
        wrote_comment = true;
    }
    if let Some(text) = &report.comments.general {
        let _ = writeln!(output, "- Class teacher: {}", text);
        wrote_comment = true;
    }
    for text in &report.comments.academic {
        let _ = writeln!(output, "- Academic: {}", text);
        wrote_comment = true;
    }
    for text in &report.comments.behavioral {
        let _ = writeln!(output, "- Behavioral: {}", text);
        wrote_comment = true;
    }
    if !wrote_comment {
        let _ = writeln!(output, "No comments recorded for this term.");
    }

    output
}

pub fn render_cohort_markdown(
    summary: &CohortSummary,
    ranked: &[RankedAggregate],
    cohort_label: &str,
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Cohort Results Summary");
    let _ = writeln!(output, "{} (generated {})", cohort_label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- {} students, {} with scores",
        summary.total_students, summary.students_with_scores
    );
    let _ = writeln!(
        output,
        "- Average performance {:.2}",
        summary.average_performance
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    if summary.grade_distribution.is_empty() {
        let _ = writeln!(output, "No scored students in this cohort.");
    } else {
        for (grade, count) in &summary.grade_distribution {
            let _ = writeln!(output, "- {}: {}", grade, count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Standings");
    for entry in ranked.iter().filter(|entry| entry.aggregate.has_scores()) {
        let _ = writeln!(
            output,
            "- #{} {} ({}) average {:.2} ({})",
            entry.class_rank,
            entry.aggregate.fullname,
            entry.aggregate.admission_number,
            entry.aggregate.average_score,
            entry.aggregate.overall_grade
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StudentAggregate, SubjectResult};
    use uuid::Uuid;

    fn ranked_with_subjects(average: f64, subjects: Vec<(f64, &str)>) -> RankedAggregate {
        let subject_results: Vec<SubjectResult> = subjects
            .into_iter()
            .map(|(score, name)| SubjectResult {
                subject_id: Uuid::new_v4(),
                subject_name: name.to_string(),
                score,
                grade: subject_grade(score),
                teacher: "W. Kamau".to_string(),
            })
            .collect();
        let subject_count = subject_results.len();
        let total_score = subject_results.iter().map(|s| s.score).sum();

        RankedAggregate {
            aggregate: StudentAggregate {
                student_id: Uuid::new_v4(),
                admission_number: "ADM-010".to_string(),
                fullname: "Amina Yusuf".to_string(),
                class_name: "Form 2".to_string(),
                stream_name: "East".to_string(),
                term_name: "Term 1".to_string(),
                academic_year: "2026".to_string(),
                total_score,
                subject_count,
                average_score: average,
                overall_grade: subject_grade(average),
                subject_results,
            },
            class_rank: 1,
            stream_rank: 1,
        }
    }

    fn comment(category: CommentCategory, text: &str) -> CommentRecord {
        CommentRecord {
            category,
            text: text.to_string(),
        }
    }

    #[test]
    fn single_categories_resolve_first_match_wins() {
        let comments = vec![
            comment(CommentCategory::General, "Shows steady progress."),
            comment(CommentCategory::Recommendation, "Promote to Form 3."),
            comment(CommentCategory::General, "Duplicate, should lose."),
            comment(CommentCategory::Academic, "Strong in sciences."),
            comment(CommentCategory::Academic, "Languages need work."),
            comment(CommentCategory::Behavioral, "Punctual all term."),
        ];

        let collated = collate_comments(&comments);
        assert_eq!(collated.recommendation.as_deref(), Some("Promote to Form 3."));
        assert_eq!(collated.general.as_deref(), Some("Shows steady progress."));
        assert_eq!(
            collated.academic,
            vec!["Strong in sciences.", "Languages need work."]
        );
        assert_eq!(collated.behavioral, vec!["Punctual all term."]);
    }

    #[test]
    fn individual_report_never_mutates_its_input() {
        let ranked = ranked_with_subjects(73.5, vec![(82.0, "Mathematics"), (65.0, "English")]);
        let snapshot = ranked.clone();

        let report = build_individual_report(&ranked, &[]);
        assert_eq!(ranked, snapshot);
        assert_eq!(report.student, snapshot);
    }

    #[test]
    fn strengths_and_improvement_areas_use_score_thresholds() {
        let ranked = ranked_with_subjects(
            61.0,
            vec![(70.0, "Mathematics"), (69.9, "English"), (49.9, "Physics")],
        );

        let report = build_individual_report(&ranked, &[]);
        assert_eq!(report.strengths, vec!["Mathematics"]);
        assert_eq!(report.areas_for_improvement, vec!["Physics"]);
    }

    #[test]
    fn individual_report_counts_subject_grades() {
        let ranked = ranked_with_subjects(
            75.0,
            vec![(85.0, "Mathematics"), (82.0, "Chemistry"), (58.0, "English")],
        );

        let report = build_individual_report(&ranked, &[]);
        assert_eq!(report.grade_distribution[&Letter::A], 2);
        assert_eq!(report.grade_distribution[&Letter::CPlus], 1);
    }

    #[test]
    fn empty_cohort_summary_is_zeroed() {
        let summary = build_cohort_summary(&[]);
        assert_eq!(summary.total_students, 0);
        assert_eq!(summary.students_with_scores, 0);
        assert_eq!(summary.average_performance, 0.0);
        assert!(summary.grade_distribution.is_empty());
    }

    #[test]
    fn unscored_students_count_in_total_only() {
        let scored_a = ranked_with_subjects(80.0, vec![(80.0, "Mathematics")]);
        let scored_b = ranked_with_subjects(60.0, vec![(60.0, "Mathematics")]);
        let unscored = ranked_with_subjects(0.0, Vec::new());

        let summary = build_cohort_summary(&[scored_a, scored_b, unscored]);
        assert_eq!(summary.total_students, 3);
        assert_eq!(summary.students_with_scores, 2);
        assert_eq!(summary.average_performance, 70.0);
        assert_eq!(summary.grade_distribution[&Letter::A], 1);
        assert_eq!(summary.grade_distribution[&Letter::BMinus], 1);
        assert_eq!(summary.grade_distribution.values().sum::<usize>(), 2);
    }

    #[test]
    fn markdown_slip_lists_subjects_and_comments() {
        let ranked = ranked_with_subjects(73.5, vec![(82.0, "Mathematics"), (65.0, "English")]);
        let comments = vec![comment(CommentCategory::Recommendation, "Promote to Form 3.")];
        let report = build_individual_report(&ranked, &comments);

        let generated = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let slip = render_individual_markdown(&report, "Hillview High", generated);

        assert!(slip.contains("# Hillview High"));
        assert!(slip.contains("Termly Result Slip for Amina Yusuf (ADM-010)"));
        assert!(slip.contains("- Mathematics: 82.0 (A) by W. Kamau"));
        assert!(slip.contains("- Principal: Promote to Form 3."));
        assert!(slip.contains("Class rank 1, stream rank 1"));
    }
}
