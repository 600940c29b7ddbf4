//! Peer ranking and year-over-year rank changes.

use standings_data::{Direction, RankedFact};
use std::collections::{BTreeMap, HashMap};

/// A company's rank on one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAssignment {
    /// Metric name
    pub financial_name: String,
    /// Company name
    pub company_name: String,
    /// Rank, 1 = highest value
    pub ranking: u32,
}

/// A company's rank change on one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankChange {
    /// Metric name
    pub financial_name: String,
    /// Company name
    pub company_name: String,
    /// Previous rank minus current rank; positive means the company moved
    /// toward rank 1
    pub rank_delta: Option<i64>,
    /// Direction derived from `rank_delta`
    pub direction: Direction,
}

/// Rank values in descending order.
///
/// Equal values share a rank; the next distinct value is ranked one past the
/// number of values strictly greater than it (`5, 5, 3` ranks `1, 1, 3`).
/// Output is ordered by rank, then company name.
pub fn rank_descending(values: &[(String, f64)]) -> Vec<(String, u32)> {
    let mut sorted: Vec<&(String, f64)> = values.iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut ranked = Vec::with_capacity(sorted.len());
    let mut previous: Option<f64> = None;
    let mut rank = 0;
    for (position, (company, value)) in sorted.into_iter().enumerate() {
        if previous != Some(*value) {
            rank = position as u32 + 1;
            previous = Some(*value);
        }
        ranked.push((company.clone(), rank));
    }

    ranked
}

/// Rank every `(report_period, financial_name)` partition of `facts`.
///
/// Facts are expected to belong to a single period.
pub fn rank_partitions(facts: &[RankedFact]) -> Vec<RankAssignment> {
    let mut partitions: BTreeMap<&str, Vec<(String, f64)>> = BTreeMap::new();
    for fact in facts {
        partitions
            .entry(fact.financial_name.as_str())
            .or_default()
            .push((fact.company_name.clone(), fact.data));
    }

    partitions
        .into_iter()
        .flat_map(|(financial_name, values)| {
            rank_descending(&values)
                .into_iter()
                .map(move |(company_name, ranking)| RankAssignment {
                    financial_name: financial_name.to_string(),
                    company_name,
                    ranking,
                })
        })
        .collect()
}

/// Rank delta against a previous rank: `previous - current`.
pub fn rank_delta(previous: Option<u32>, current: u32) -> Option<i64> {
    previous.map(|previous| i64::from(previous) - i64::from(current))
}

/// Compare current rankings with those of the same quarter a year earlier.
///
/// Both maps are keyed by `(financial_name, company_name)`. Every current
/// entry yields a change; entries without a previous rank get no delta and
/// [`Direction::Unknown`].
pub fn rank_changes(
    current: &HashMap<(String, String), u32>,
    previous: &HashMap<(String, String), u32>,
) -> Vec<RankChange> {
    let mut changes: Vec<RankChange> = current
        .iter()
        .map(|(key, &ranking)| {
            let rank_delta = rank_delta(previous.get(key).copied(), ranking);
            RankChange {
                financial_name: key.0.clone(),
                company_name: key.1.clone(),
                rank_delta,
                direction: Direction::from_delta(rank_delta),
            }
        })
        .collect();

    changes.sort_by(|a, b| {
        (a.financial_name.as_str(), a.company_name.as_str())
            .cmp(&(b.financial_name.as_str(), b.company_name.as_str()))
    });
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use standings_data::ReportPeriod;

    fn values(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(c, v)| (c.to_string(), *v)).collect()
    }

    fn fact(name: &str, company: &str, data: f64) -> RankedFact {
        RankedFact {
            report_period: ReportPeriod::from_parts(2024, 2).unwrap(),
            financial_name: name.to_string(),
            company_name: company.to_string(),
            data,
            ranking: None,
            direction: None,
            rank_delta: None,
        }
    }

    fn key(name: &str, company: &str) -> (String, String) {
        (name.to_string(), company.to_string())
    }

    #[test]
    fn ties_share_rank_and_skip() {
        let ranked = rank_descending(&values(&[("C", 3.0), ("B", 5.0), ("A", 5.0)]));
        assert_eq!(
            ranked,
            vec![
                ("A".to_string(), 1),
                ("B".to_string(), 1),
                ("C".to_string(), 3)
            ]
        );
    }

    #[rstest]
    #[case(&[10.0, 9.0, 8.0], &[1, 2, 3])]
    #[case(&[7.0, 7.0, 7.0], &[1, 1, 1])]
    #[case(&[9.0, 8.0, 8.0, 1.0], &[1, 2, 2, 4])]
    #[case(&[-1.0, 0.0, -1.0], &[2, 1, 2])]
    fn competition_ranking(#[case] input: &[f64], #[case] expected: &[u32]) {
        let named: Vec<(String, f64)> = input
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("c{i}"), *v))
            .collect();
        let ranked: HashMap<String, u32> = rank_descending(&named).into_iter().collect();
        for (i, want) in expected.iter().enumerate() {
            assert_eq!(ranked[&format!("c{i}")], *want, "company c{i}");
        }
    }

    #[test]
    fn empty_input() {
        assert!(rank_descending(&[]).is_empty());
    }

    #[test]
    fn partitions_are_ranked_independently() {
        let facts = vec![
            fact("roe", "A", 5.0),
            fact("roe", "B", 5.0),
            fact("roe", "C", 3.0),
            fact("total_assets", "A", 100.0),
            fact("total_assets", "C", 300.0),
        ];
        let ranks: HashMap<(String, String), u32> = rank_partitions(&facts)
            .into_iter()
            .map(|a| ((a.financial_name, a.company_name), a.ranking))
            .collect();

        assert_eq!(ranks[&key("roe", "A")], 1);
        assert_eq!(ranks[&key("roe", "B")], 1);
        assert_eq!(ranks[&key("roe", "C")], 3);
        assert_eq!(ranks[&key("total_assets", "C")], 1);
        assert_eq!(ranks[&key("total_assets", "A")], 2);
    }

    #[test]
    fn delta_is_previous_minus_current() {
        assert_eq!(rank_delta(Some(1), 3), Some(-2));
        assert_eq!(rank_delta(Some(4), 1), Some(3));
        assert_eq!(rank_delta(Some(2), 2), Some(0));
        assert_eq!(rank_delta(None, 2), None);
    }

    #[test]
    fn changes_against_prior_year() {
        let current = HashMap::from([
            (key("roe", "A"), 3),
            (key("roe", "B"), 1),
            (key("roe", "C"), 2),
        ]);
        let previous = HashMap::from([(key("roe", "A"), 1), (key("roe", "B"), 1)]);

        let changes = rank_changes(&current, &previous);
        assert_eq!(changes.len(), 3);

        assert_eq!(changes[0].company_name, "A");
        assert_eq!(changes[0].rank_delta, Some(-2));
        assert_eq!(changes[0].direction, Direction::Down);

        assert_eq!(changes[1].rank_delta, Some(0));
        assert_eq!(changes[1].direction, Direction::Flat);

        assert_eq!(changes[2].rank_delta, None);
        assert_eq!(changes[2].direction, Direction::Unknown);
    }
}
