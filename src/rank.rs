//! Final ordering of search results.

use crate::entity::NearbyBusiness;
use crate::merge::Candidate;
use std::cmp::Ordering;

/// Order candidates nearest first, breaking distance ties by name
/// (case-sensitive, ascending) and then by id so the output is fully
/// deterministic.
pub fn rank(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(compare);
    candidates
}

fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance_meters
        .total_cmp(&b.distance_meters)
        .then_with(|| a.business.name.cmp(&b.business.name))
        .then_with(|| a.business.id.cmp(&b.business.id))
}

/// Distance for display: nearest whole meter, halves rounded away from zero.
pub fn display_meters(distance_meters: f64) -> i64 {
    distance_meters.round() as i64
}

/// Ranked output records with display distances.
pub fn into_output(ranked: Vec<Candidate>) -> Vec<NearbyBusiness> {
    ranked
        .into_iter()
        .map(|candidate| NearbyBusiness {
            distance_meters: display_meters(candidate.distance_meters),
            business: candidate.business,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Business;

    fn candidate(id: &str, name: &str, distance: f64) -> Candidate {
        Candidate::new(
            Business {
                id: id.into(),
                name: name.into(),
                ..Default::default()
            },
            distance,
        )
    }

    fn names(ranked: &[Candidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.business.name.as_str()).collect()
    }

    #[test]
    fn test_sorted_by_distance() {
        let ranked = rank(vec![
            candidate("1", "Far", 4_000.0),
            candidate("2", "Near", 10.0),
            candidate("3", "Mid", 900.0),
        ]);
        assert_eq!(names(&ranked), vec!["Near", "Mid", "Far"]);
    }

    #[test]
    fn test_equal_distance_ordered_by_name() {
        let ranked = rank(vec![
            candidate("2", "Beta", 2_000.0),
            candidate("1", "Alfa", 2_000.0),
        ]);
        assert_eq!(names(&ranked), vec!["Alfa", "Beta"]);
    }

    #[test]
    fn test_name_tie_break_is_case_sensitive() {
        let ranked = rank(vec![
            candidate("1", "alfa", 5.0),
            candidate("2", "Beta", 5.0),
        ]);
        // uppercase sorts before lowercase
        assert_eq!(names(&ranked), vec!["Beta", "alfa"]);
    }

    #[test]
    fn test_unrounded_distances_decide_order() {
        // both display as 100 m, the closer one still ranks first
        let ranked = rank(vec![
            candidate("1", "Alfa", 100.4),
            candidate("2", "Zulu", 99.6),
        ]);
        assert_eq!(names(&ranked), vec!["Zulu", "Alfa"]);

        let output = into_output(ranked);
        assert!(output.iter().all(|b| b.distance_meters == 100));
    }

    #[test]
    fn test_display_rounding() {
        assert_eq!(display_meters(1111.95), 1112);
        assert_eq!(display_meters(0.49), 0);
        assert_eq!(display_meters(2.5), 3);
    }
}
