use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::grade::total_grade;
use crate::models::RankedAggregate;

/// Writes a ranked cohort to a CSV mark sheet and returns the artifact path.
///
/// The `total_grade` column grades the raw term total against the fixed
/// curriculum denominator; `overall_grade` carries the average-based grade
/// from aggregation.
pub fn export_cohort_csv(ranked: &[RankedAggregate], path: &Path) -> anyhow::Result<PathBuf> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record([
        "admission_number",
        "fullname",
        "class",
        "stream",
        "subject_count",
        "total_score",
        "average_score",
        "overall_grade",
        "total_grade",
        "class_rank",
        "stream_rank",
    ])?;

    for entry in ranked {
        let aggregate = &entry.aggregate;
        let subject_count = aggregate.subject_count.to_string();
        let total = format!("{:.1}", aggregate.total_score);
        let average = format!("{:.2}", aggregate.average_score);
        let class_rank = entry.class_rank.to_string();
        let stream_rank = entry.stream_rank.to_string();
        writer.write_record([
            aggregate.admission_number.as_str(),
            aggregate.fullname.as_str(),
            aggregate.class_name.as_str(),
            aggregate.stream_name.as_str(),
            subject_count.as_str(),
            total.as_str(),
            average.as_str(),
            aggregate.overall_grade.as_str(),
            total_grade(aggregate.total_score).as_str(),
            class_rank.as_str(),
            stream_rank.as_str(),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    tracing::info!(rows = ranked.len(), path = %path.display(), "exported cohort mark sheet");

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::subject_grade;
    use crate::models::StudentAggregate;
    use uuid::Uuid;

    fn ranked(name: &str, admission: &str, total: f64, count: usize) -> RankedAggregate {
        let average = if count > 0 { total / count as f64 } else { 0.0 };
        RankedAggregate {
            aggregate: StudentAggregate {
                student_id: Uuid::new_v4(),
                admission_number: admission.to_string(),
                fullname: name.to_string(),
                class_name: "Form 4".to_string(),
                stream_name: "North".to_string(),
                term_name: "Term 2".to_string(),
                academic_year: "2026".to_string(),
                total_score: total,
                subject_count: count,
                average_score: average,
                overall_grade: subject_grade(average),
                subject_results: Vec::new(),
            },
            class_rank: 1,
            stream_rank: 1,
        }
    }

    #[test]
    fn mark_sheet_carries_both_grade_scales() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        let cohort = vec![ranked("Amina Yusuf", "ADM-001", 880.0, 11)];
        let written = export_cohort_csv(&cohort, &path).unwrap();
        assert_eq!(written, path);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("admission_number,fullname"));

        // 880/11 averages 80 (subject A); 880/1100 = 80% clears the total
        // table's 78% A line as well.
        let row = lines.next().unwrap();
        assert!(row.contains("ADM-001"));
        assert!(row.contains(",880.0,80.00,A,A,1,1"));
    }

    #[test]
    fn empty_cohort_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        export_cohort_csv(&[], &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
