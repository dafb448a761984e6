use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{RankedAggregate, StudentAggregate};

/// Ranks a cohort (one class/stream/term/year slice) by average score,
/// descending, using competition ranking: tied averages share the lower rank
/// and the next distinct average skips past the tie group.
///
/// The sort is stable, so exact ties keep their input order. `stream_rank`
/// starts out equal to `class_rank`; call [`assign_stream_ranks`] afterwards
/// when the cohort spans more than one stream.
pub fn rank_cohort(aggregates: Vec<StudentAggregate>) -> Vec<RankedAggregate> {
    let mut ranked: Vec<RankedAggregate> = aggregates
        .into_iter()
        .map(|aggregate| RankedAggregate {
            aggregate,
            class_rank: 0,
            stream_rank: 0,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.aggregate
            .average_score
            .partial_cmp(&a.aggregate.average_score)
            .unwrap_or(Ordering::Equal)
    });

    let mut rank = 1usize;
    let mut skip = 0usize;
    let mut previous: Option<f64> = None;

    for entry in ranked.iter_mut() {
        let average = entry.aggregate.average_score;
        match previous {
            Some(prev) if average < prev => {
                rank += 1 + skip;
                skip = 0;
            }
            Some(prev) if average == prev => {
                skip += 1;
            }
            _ => {}
        }
        entry.class_rank = rank;
        entry.stream_rank = rank;
        previous = Some(average);
    }

    ranked
}

/// Recomputes `stream_rank` within each stream partition of an already ranked
/// cohort, so it reflects standing among streammates rather than aliasing the
/// class rank.
pub fn assign_stream_ranks(ranked: &mut [RankedAggregate]) {
    let mut partitions: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, entry) in ranked.iter().enumerate() {
        partitions
            .entry(entry.aggregate.stream_name.clone())
            .or_default()
            .push(index);
    }

    for indexes in partitions.values() {
        let mut rank = 1usize;
        let mut skip = 0usize;
        let mut previous: Option<f64> = None;

        // Indexes follow the cohort's sorted order, so each partition is
        // already average-descending.
        for &index in indexes {
            let average = ranked[index].aggregate.average_score;
            match previous {
                Some(prev) if average < prev => {
                    rank += 1 + skip;
                    skip = 0;
                }
                Some(prev) if average == prev => {
                    skip += 1;
                }
                _ => {}
            }
            ranked[index].stream_rank = rank;
            previous = Some(average);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::subject_grade;
    use crate::models::StudentAggregate;
    use uuid::Uuid;

    fn aggregate_with_average(name: &str, stream: &str, average: f64) -> StudentAggregate {
        StudentAggregate {
            student_id: Uuid::new_v4(),
            admission_number: format!("ADM-{name}"),
            fullname: name.to_string(),
            class_name: "Form 3".to_string(),
            stream_name: stream.to_string(),
            term_name: "Term 1".to_string(),
            academic_year: "2026".to_string(),
            total_score: average * 3.0,
            subject_count: 3,
            average_score: average,
            overall_grade: subject_grade(average),
            subject_results: Vec::new(),
        }
    }

    #[test]
    fn ties_share_rank_and_next_rank_skips() {
        let cohort = vec![
            aggregate_with_average("Amina", "East", 90.0),
            aggregate_with_average("Brian", "East", 90.0),
            aggregate_with_average("Cynthia", "East", 80.0),
            aggregate_with_average("David", "East", 70.0),
        ];

        let ranked = rank_cohort(cohort);
        let ranks: Vec<usize> = ranked.iter().map(|r| r.class_rank).collect();
        assert_eq!(ranks, vec![1, 1, 3, 4]);
    }

    #[test]
    fn singleton_and_empty_cohorts() {
        let ranked = rank_cohort(vec![aggregate_with_average("Amina", "East", 50.0)]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].class_rank, 1);

        assert!(rank_cohort(Vec::new()).is_empty());
    }

    #[test]
    fn exact_ties_keep_input_order() {
        let cohort = vec![
            aggregate_with_average("Amina", "East", 75.0),
            aggregate_with_average("Brian", "East", 75.0),
            aggregate_with_average("Cynthia", "East", 75.0),
        ];

        let ranked = rank_cohort(cohort);
        let names: Vec<&str> = ranked.iter().map(|r| r.aggregate.fullname.as_str()).collect();
        assert_eq!(names, vec!["Amina", "Brian", "Cynthia"]);
        assert!(ranked.iter().all(|r| r.class_rank == 1));
    }

    #[test]
    fn sorting_is_descending_by_average() {
        let cohort = vec![
            aggregate_with_average("Low", "East", 42.0),
            aggregate_with_average("High", "East", 88.0),
            aggregate_with_average("Mid", "East", 63.0),
        ];

        let ranked = rank_cohort(cohort);
        let names: Vec<&str> = ranked.iter().map(|r| r.aggregate.fullname.as_str()).collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
        assert_eq!(ranked[2].class_rank, 3);
    }

    #[test]
    fn stream_ranks_are_computed_per_partition() {
        let cohort = vec![
            aggregate_with_average("Amina", "East", 92.0),
            aggregate_with_average("Brian", "West", 85.0),
            aggregate_with_average("Cynthia", "East", 78.0),
            aggregate_with_average("David", "West", 70.0),
        ];

        let mut ranked = rank_cohort(cohort);
        assign_stream_ranks(&mut ranked);

        let by_name: HashMap<&str, (usize, usize)> = ranked
            .iter()
            .map(|r| (r.aggregate.fullname.as_str(), (r.class_rank, r.stream_rank)))
            .collect();

        assert_eq!(by_name["Amina"], (1, 1));
        assert_eq!(by_name["Brian"], (2, 1));
        assert_eq!(by_name["Cynthia"], (3, 2));
        assert_eq!(by_name["David"], (4, 2));
    }

    #[test]
    fn stream_rank_defaults_to_class_rank() {
        let cohort = vec![
            aggregate_with_average("Amina", "East", 92.0),
            aggregate_with_average("Brian", "West", 85.0),
        ];

        let ranked = rank_cohort(cohort);
        assert!(ranked.iter().all(|r| r.stream_rank == r.class_rank));
    }
}
