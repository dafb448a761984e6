use crate::models::{RankedAggregate, RosterEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsMessage {
    pub student: String,
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsBatch {
    pub messages: Vec<ResultsMessage>,
    pub skipped: Vec<String>,
}

pub fn results_message(ranked: &RankedAggregate) -> String {
    let aggregate = &ranked.aggregate;
    format!(
        "Dear Parent/Guardian, {}'s {} {} results: Average {:.1} ({}). {} {}. Login to portal for details.",
        aggregate.fullname,
        aggregate.term_name,
        aggregate.academic_year,
        aggregate.average_score,
        aggregate.overall_grade,
        aggregate.class_name,
        aggregate.stream_name
    )
}

/// Composes one guardian message per ranked student. Students without a
/// guardian phone are skipped and reported by name; actual dispatch is left
/// to the SMS gateway.
pub fn compose_results_batch(ranked: &[RankedAggregate], roster: &[RosterEntry]) -> ResultsBatch {
    let mut batch = ResultsBatch::default();

    for entry in ranked {
        let phone = roster
            .iter()
            .find(|student| student.student_id == entry.aggregate.student_id)
            .and_then(|student| student.guardian_phone.as_deref())
            .filter(|phone| !phone.trim().is_empty());

        match phone {
            Some(phone) => batch.messages.push(ResultsMessage {
                student: entry.aggregate.fullname.clone(),
                phone: phone.to_string(),
                message: results_message(entry),
            }),
            None => batch.skipped.push(entry.aggregate.fullname.clone()),
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::subject_grade;
    use crate::models::StudentAggregate;
    use uuid::Uuid;

    fn ranked(name: &str, average: f64) -> RankedAggregate {
        RankedAggregate {
            aggregate: StudentAggregate {
                student_id: Uuid::new_v4(),
                admission_number: format!("ADM-{name}"),
                fullname: name.to_string(),
                class_name: "Form 2".to_string(),
                stream_name: "East".to_string(),
                term_name: "Term 1".to_string(),
                academic_year: "2026".to_string(),
                total_score: average * 2.0,
                subject_count: 2,
                average_score: average,
                overall_grade: subject_grade(average),
                subject_results: Vec::new(),
            },
            class_rank: 1,
            stream_rank: 1,
        }
    }

    fn roster_entry(ranked: &RankedAggregate, phone: Option<&str>) -> RosterEntry {
        RosterEntry {
            student_id: ranked.aggregate.student_id,
            admission_number: ranked.aggregate.admission_number.clone(),
            fullname: ranked.aggregate.fullname.clone(),
            class_name: ranked.aggregate.class_name.clone(),
            stream_name: ranked.aggregate.stream_name.clone(),
            guardian_phone: phone.map(str::to_string),
        }
    }

    #[test]
    fn message_formats_average_to_one_decimal() {
        let entry = ranked("Amina Yusuf", 72.25);
        assert_eq!(
            results_message(&entry),
            "Dear Parent/Guardian, Amina Yusuf's Term 1 2026 results: \
             Average 72.2 (B+). Form 2 East. Login to portal for details."
        );
    }

    #[test]
    fn batch_skips_missing_and_blank_phones() {
        let with_phone = ranked("Amina Yusuf", 81.0);
        let blank_phone = ranked("Brian Otieno", 64.0);
        let no_phone = ranked("Cynthia Njeri", 55.0);
        let roster = vec![
            roster_entry(&with_phone, Some("+254700111222")),
            roster_entry(&blank_phone, Some("  ")),
            roster_entry(&no_phone, None),
        ];

        let batch = compose_results_batch(&[with_phone, blank_phone, no_phone], &roster);
        assert_eq!(batch.messages.len(), 1);
        assert_eq!(batch.messages[0].phone, "+254700111222");
        assert_eq!(batch.skipped, vec!["Brian Otieno", "Cynthia Njeri"]);
    }
}
