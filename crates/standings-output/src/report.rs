//! Ranking report generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use standings_data::{Direction, RankedFact, ReportPeriod};

/// Metrics reported in units of 100 million.
const CURRENCY_METRICS: [&str; 4] = ["total_equity", "net_income", "total_assets", "capital_stock"];

/// Ratio metrics reported to two decimals.
const RATIO_METRICS: [&str; 2] = ["roa", "roe"];

const CURRENCY_UNIT: f64 = 100_000_000.0;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Value as shown in a report.
///
/// Currency metrics are divided by 100,000,000 and rounded to one decimal,
/// ROA and ROE are rounded to two decimals, and anything else is shown as
/// stored.
pub fn display_value(financial_name: &str, data: f64) -> f64 {
    if CURRENCY_METRICS.contains(&financial_name) {
        round_to(data / CURRENCY_UNIT, 1)
    } else if RATIO_METRICS.contains(&financial_name) {
        round_to(data, 2)
    } else {
        data
    }
}

/// Change marker for a rank delta: `X` when unknown, `-` when unchanged,
/// otherwise `▲n` or `▼n`.
pub fn change_marker(rank_delta: Option<i64>) -> String {
    let direction = Direction::from_delta(rank_delta);
    match (direction, rank_delta) {
        (Direction::Up | Direction::Down, Some(delta)) => {
            format!("{}{}", direction.symbol(), delta.unsigned_abs())
        }
        _ => direction.symbol().to_string(),
    }
}

/// One company's line in a metric section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Rank, absent if the ranking pass has not run
    pub ranking: Option<u32>,
    /// Company name
    pub company_name: String,
    /// Stored value
    pub value: f64,
    /// Scaled and rounded value
    pub display_value: f64,
    /// Signed rank delta
    pub rank_delta: Option<i64>,
    /// Change marker derived from `rank_delta`
    pub change: String,
}

/// All rows of one metric, best rank first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSection {
    /// Metric name
    pub financial_name: String,
    /// Rows ordered by ranking
    pub rows: Vec<ReportRow>,
}

/// Ranking report for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    /// Period being reported
    pub report_period: ReportPeriod,
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
    /// One section per metric, ordered by metric name
    pub sections: Vec<MetricSection>,
}

impl RankingReport {
    /// Build a report from ranked facts.
    ///
    /// Facts are expected in store order: metric name, then ranking. Facts
    /// from other periods are ignored.
    pub fn from_facts(report_period: ReportPeriod, facts: &[RankedFact]) -> Self {
        let mut sections: Vec<MetricSection> = Vec::new();

        for fact in facts.iter().filter(|f| f.report_period == report_period) {
            let row = ReportRow {
                ranking: fact.ranking,
                company_name: fact.company_name.clone(),
                value: fact.data,
                display_value: display_value(&fact.financial_name, fact.data),
                rank_delta: fact.rank_delta,
                change: change_marker(fact.rank_delta),
            };

            match sections.last_mut() {
                Some(section) if section.financial_name == fact.financial_name => {
                    section.rows.push(row);
                }
                _ => sections.push(MetricSection {
                    financial_name: fact.financial_name.clone(),
                    rows: vec![row],
                }),
            }
        }

        Self {
            report_period,
            generated_at: Utc::now(),
            sections,
        }
    }

    /// Section of one metric.
    pub fn section(&self, financial_name: &str) -> Option<&MetricSection> {
        self.sections
            .iter()
            .find(|s| s.financial_name == financial_name)
    }

    /// Total number of rows.
    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|s| s.rows.len()).sum()
    }

    /// Whether the report has no rows.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Render as a plain text table.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nRankings: {}\n", self.report_period));
        output.push_str(&"=".repeat(64));
        output.push('\n');

        for section in &self.sections {
            output.push_str(&format!("\n{}\n", section.financial_name));
            output.push_str(&format!(
                "{:>6}  {:<30} {:>16} {:>8}\n",
                "Rank", "Company", "Value", "Change"
            ));
            output.push_str(&"-".repeat(64));
            output.push('\n');

            for row in &section.rows {
                let ranking = row.ranking.map_or_else(|| "-".to_string(), |r| r.to_string());
                output.push_str(&format!(
                    "{:>6}  {:<30} {:>16} {:>8}\n",
                    ranking, row.company_name, row.display_value, row.change
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn period() -> ReportPeriod {
        ReportPeriod::from_parts(2024, 2).unwrap()
    }

    fn fact(name: &str, company: &str, data: f64, ranking: u32, delta: Option<i64>) -> RankedFact {
        RankedFact {
            report_period: period(),
            financial_name: name.to_string(),
            company_name: company.to_string(),
            data,
            ranking: Some(ranking),
            direction: Some(Direction::from_delta(delta)),
            rank_delta: delta,
        }
    }

    #[rstest]
    #[case("total_assets", 1_234_567_890_123.0, 12345.7)]
    #[case("capital_stock", 250_000_000.0, 2.5)]
    #[case("net_income", -3_040_000_000.0, -30.4)]
    #[case("roe", 6.666_666, 6.67)]
    #[case("roa", -0.004, -0.0)]
    #[case("total_employees", 1523.0, 1523.0)]
    #[case("domestic_locations", 12.0, 12.0)]
    fn display_scaling(#[case] name: &str, #[case] data: f64, #[case] expected: f64) {
        assert_eq!(display_value(name, data), expected);
    }

    #[rstest]
    #[case(None, "X")]
    #[case(Some(0), "-")]
    #[case(Some(3), "▲3")]
    #[case(Some(-2), "▼2")]
    fn change_markers(#[case] delta: Option<i64>, #[case] expected: &str) {
        assert_eq!(change_marker(delta), expected);
    }

    #[test]
    fn sections_follow_fact_order() {
        let facts = vec![
            fact("roe", "B", 9.0, 1, Some(1)),
            fact("roe", "A", 5.0, 2, None),
            fact("total_assets", "A", 300_000_000.0, 1, Some(0)),
        ];
        let report = RankingReport::from_facts(period(), &facts);

        assert_eq!(report.sections.len(), 2);
        assert_eq!(report.row_count(), 3);

        let roe = report.section("roe").unwrap();
        assert_eq!(roe.rows[0].company_name, "B");
        assert_eq!(roe.rows[0].change, "▲1");
        assert_eq!(roe.rows[1].change, "X");

        let assets = report.section("total_assets").unwrap();
        assert_eq!(assets.rows[0].display_value, 3.0);
        assert_eq!(assets.rows[0].change, "-");
    }

    #[test]
    fn other_periods_ignored() {
        let mut stale = fact("roe", "A", 5.0, 1, None);
        stale.report_period = ReportPeriod::from_parts(2023, 2).unwrap();
        let report = RankingReport::from_facts(period(), &[stale]);
        assert!(report.is_empty());
    }

    #[test]
    fn ascii_table() {
        let report = RankingReport::from_facts(period(), &[fact("roe", "Alpha", 5.0, 1, Some(-2))]);
        let table = report.to_ascii_table();
        assert!(table.contains("Rankings: 2024-Q2"));
        assert!(table.contains("roe"));
        assert!(table.contains("Alpha"));
        assert!(table.contains("▼2"));
    }
}
