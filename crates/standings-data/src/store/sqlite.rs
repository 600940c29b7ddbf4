//! SQLite store for raw facts, calculated metrics and ranked facts.

use crate::error::{DataError, Result};
use crate::period::ReportPeriod;
use crate::records::{
    BalanceSheetFact, CalculatedMetric, Direction, NormalizationStatus, RankedFact, RawFact,
};
use crate::schema::{SourceExpr, SourceTable};
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, params};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// SQLite store backing the ranking engine.
///
/// Write methods never open transactions of their own when one is already
/// active, so a whole engine phase can be grouped with [`Self::in_transaction`].
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

/// Row counts per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Companies in the directory
    pub companies: usize,
    /// Raw fact rows across all raw tables
    pub raw_facts: usize,
    /// Calculated metric rows
    pub calculated_metrics: usize,
    /// Ranked fact rows
    pub ranked_facts: usize,
}

/// Outcome of merging one metric's values into the ranked fact table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    /// Rows inserted or refreshed
    pub written: usize,
    /// Rows of the same period and metric no longer produced by the source
    pub pruned: usize,
}

impl ToSql for ReportPeriod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for ReportPeriod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<Self>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

const CALCULATED_METRIC_COLUMNS: &str = "report_period, company_name, quarter_num, fiscal_month,
    total_equity, total_assets, prev_total_equity, prev_total_assets,
    net_income, current_net_income, prev_net_income, current_q1_net_income,
    normalization, avg_total_assets, avg_total_equity, roa, roe";

fn calculated_metric_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CalculatedMetric> {
    Ok(CalculatedMetric {
        report_period: row.get(0)?,
        company_name: row.get(1)?,
        quarter_num: row.get(2)?,
        fiscal_month: row.get(3)?,
        total_equity: row.get(4)?,
        total_assets: row.get(5)?,
        prev_total_equity: row.get(6)?,
        prev_total_assets: row.get(7)?,
        net_income: row.get(8)?,
        current_net_income: row.get(9)?,
        prev_net_income: row.get(10)?,
        current_q1_net_income: row.get(11)?,
        normalization: NormalizationStatus::from_db_str(&row.get::<_, String>(12)?)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
        avg_total_assets: row.get(13)?,
        avg_total_equity: row.get(14)?,
        roa: row.get(15)?,
        roe: row.get(16)?,
    })
}

impl SqliteStore {
    /// Open a store at the given path, creating the schema if needed.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        tracing::debug!(path = %path.as_ref().display(), "opening store");
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        // Company directory
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS company_info (
                company_name TEXT PRIMARY KEY,
                added_at TEXT NOT NULL
            )",
            [],
        )?;

        // Raw fact tables, one per disclosure category
        for table in SourceTable::RAW {
            let mut columns = vec![
                "company_name TEXT NOT NULL".to_string(),
                "report_period TEXT NOT NULL".to_string(),
            ];
            columns.extend(table.numeric_columns().iter().map(|c| format!("{c} REAL")));
            columns.extend(table.text_columns().iter().map(|c| format!("{c} TEXT")));
            columns.push("PRIMARY KEY (company_name, report_period)".to_string());

            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
                    table.table_name(),
                    columns.join(",\n")
                ),
                [],
            )?;
        }

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS calculated_metrics (
                report_period TEXT NOT NULL,
                company_name TEXT NOT NULL,
                quarter_num INTEGER NOT NULL,
                fiscal_month TEXT,
                total_equity REAL NOT NULL,
                total_assets REAL NOT NULL,
                prev_total_equity REAL,
                prev_total_assets REAL,
                net_income REAL NOT NULL,
                current_net_income REAL NOT NULL,
                prev_net_income REAL,
                current_q1_net_income REAL,
                normalization TEXT NOT NULL,
                avg_total_assets REAL,
                avg_total_equity REAL,
                roa REAL NOT NULL,
                roe REAL NOT NULL,
                PRIMARY KEY (report_period, company_name)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS financial_rank_table (
                report_period TEXT NOT NULL,
                financial_name TEXT NOT NULL,
                company_name TEXT NOT NULL,
                data REAL NOT NULL,
                ranking INTEGER,
                differ_sign TEXT,
                difer_data INTEGER,
                PRIMARY KEY (report_period, financial_name, company_name)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rank_period_name
             ON financial_rank_table(report_period, financial_name, ranking)",
            [],
        )?;

        Ok(())
    }

    /// Run `f` inside one transaction.
    ///
    /// The transaction commits when `f` succeeds and rolls back when it fails.
    /// Called while a transaction is already active, `f` simply joins it.
    pub fn in_transaction<T, E>(
        &self,
        f: impl FnOnce(&Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<DataError>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| E::from(DataError::from(e)))?;
        let out = f(self)?;
        tx.commit().map_err(|e| E::from(DataError::from(e)))?;
        Ok(out)
    }

    /// Add a company to the directory.
    pub fn add_company(&self, company_name: &str) -> Result<()> {
        let added_at = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO company_info (company_name, added_at) VALUES (?1, ?2)
             ON CONFLICT (company_name) DO NOTHING",
            params![company_name, added_at],
        )?;

        Ok(())
    }

    /// Remove a company from the directory.
    pub fn remove_company(&self, company_name: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM company_info WHERE company_name = ?1",
            params![company_name],
        )?;
        Ok(removed > 0)
    }

    /// All companies in the directory.
    pub fn companies(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT company_name FROM company_info ORDER BY company_name")?;

        let companies = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<String>, _>>()?;

        Ok(companies)
    }

    /// Store one raw fact, replacing any previous row for the same key.
    pub fn put_raw_fact(&self, fact: &RawFact) -> Result<()> {
        if fact.table == SourceTable::CalculatedMetrics {
            return Err(DataError::UnknownTable(format!(
                "{} is not a raw fact table",
                fact.table
            )));
        }

        let mut columns = vec!["company_name", "report_period"];
        let mut values: Vec<&dyn ToSql> = vec![&fact.company_name, &fact.report_period];
        for (column, value) in &fact.values {
            columns.push(fact.table.numeric_column(column)?);
            values.push(value);
        }
        for (column, label) in &fact.labels {
            columns.push(fact.table.text_column(column)?);
            values.push(label);
        }

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            fact.table.table_name(),
            columns.join(", "),
            placeholders
        );

        self.conn.execute(&sql, values.as_slice())?;
        Ok(())
    }

    /// Store many raw facts in one transaction.
    pub fn put_raw_facts(&self, facts: &[RawFact]) -> Result<usize> {
        self.in_transaction(|store| {
            for fact in facts {
                store.put_raw_fact(fact)?;
            }
            Ok(facts.len())
        })
    }

    /// Balance-sheet inputs of every company reporting in a period.
    pub fn balance_sheet_facts(
        &self,
        period: ReportPeriod,
    ) -> Result<HashMap<String, BalanceSheetFact>> {
        let mut stmt = self.conn.prepare(
            "SELECT company_name, fiscal_month, total_assets, total_equity, net_income
             FROM financial_condition
             WHERE report_period = ?1",
        )?;

        let rows = stmt.query_map(params![period], |row| {
            Ok(BalanceSheetFact {
                company_name: row.get(0)?,
                fiscal_month: row.get(1)?,
                total_assets: row.get(2)?,
                total_equity: row.get(3)?,
                net_income: row.get(4)?,
            })
        })?;

        let mut facts = HashMap::new();
        for row in rows {
            let fact = row?;
            facts.insert(fact.company_name.clone(), fact);
        }

        Ok(facts)
    }

    /// Insert or overwrite a calculated metric.
    pub fn upsert_calculated_metric(&self, metric: &CalculatedMetric) -> Result<()> {
        self.conn.execute(
            "INSERT INTO calculated_metrics (
                report_period, company_name, quarter_num, fiscal_month,
                total_equity, total_assets, prev_total_equity, prev_total_assets,
                net_income, current_net_income, prev_net_income, current_q1_net_income,
                normalization, avg_total_assets, avg_total_equity, roa, roe
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT (report_period, company_name) DO UPDATE SET
                quarter_num = excluded.quarter_num,
                fiscal_month = excluded.fiscal_month,
                total_equity = excluded.total_equity,
                total_assets = excluded.total_assets,
                prev_total_equity = excluded.prev_total_equity,
                prev_total_assets = excluded.prev_total_assets,
                net_income = excluded.net_income,
                current_net_income = excluded.current_net_income,
                prev_net_income = excluded.prev_net_income,
                current_q1_net_income = excluded.current_q1_net_income,
                normalization = excluded.normalization,
                avg_total_assets = excluded.avg_total_assets,
                avg_total_equity = excluded.avg_total_equity,
                roa = excluded.roa,
                roe = excluded.roe",
            params![
                metric.report_period,
                metric.company_name,
                metric.quarter_num,
                metric.fiscal_month,
                metric.total_equity,
                metric.total_assets,
                metric.prev_total_equity,
                metric.prev_total_assets,
                metric.net_income,
                metric.current_net_income,
                metric.prev_net_income,
                metric.current_q1_net_income,
                metric.normalization.to_db_str(),
                metric.avg_total_assets,
                metric.avg_total_equity,
                metric.roa,
                metric.roe,
            ],
        )?;

        Ok(())
    }

    /// Calculated metrics of a period, ordered by company.
    pub fn calculated_metrics(&self, period: ReportPeriod) -> Result<Vec<CalculatedMetric>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CALCULATED_METRIC_COLUMNS}
             FROM calculated_metrics
             WHERE report_period = ?1
             ORDER BY company_name"
        ))?;

        let metrics = stmt
            .query_map(params![period], calculated_metric_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    /// Calculated metric of one company, if any.
    pub fn calculated_metric(
        &self,
        period: ReportPeriod,
        company_name: &str,
    ) -> Result<Option<CalculatedMetric>> {
        let metric = self
            .conn
            .query_row(
                &format!(
                    "SELECT {CALCULATED_METRIC_COLUMNS}
                     FROM calculated_metrics
                     WHERE report_period = ?1 AND company_name = ?2"
                ),
                params![period, company_name],
                calculated_metric_from_row,
            )
            .optional()?;

        Ok(metric)
    }

    /// Check that the table behind `source` has every referenced column.
    ///
    /// Raw tables written by an outside loader may predate the schema and
    /// lack columns; querying them would fail mid-phase.
    pub fn verify_source(&self, source: &SourceExpr) -> Result<()> {
        let table = source.table().table_name();
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let present = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<BTreeSet<String>, _>>()?;

        if present.is_empty() {
            return Err(DataError::UnknownTable(table.to_string()));
        }
        match source.columns().iter().find(|c| !present.contains(**c)) {
            Some(missing) => Err(DataError::UnknownColumn {
                table: table.to_string(),
                column: (*missing).to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Evaluate a metric source for a period, yielding `(company_name, value)`
    /// pairs with NULL values left out.
    pub fn metric_values(
        &self,
        period: ReportPeriod,
        source: &SourceExpr,
    ) -> Result<Vec<(String, f64)>> {
        let mut stmt = self.conn.prepare(&source.select_sql())?;

        let values = stmt
            .query_map(params![period], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, f64)>, _>>()?;

        Ok(values)
    }

    /// Merge one metric's values into the ranked fact table.
    ///
    /// Every written row starts with ranking, direction and delta unset. Rows of
    /// the same period and metric whose company is absent from `values` are
    /// removed.
    pub fn merge_ranked_facts(
        &self,
        period: ReportPeriod,
        financial_name: &str,
        values: &[(String, f64)],
    ) -> Result<MergeCounts> {
        self.in_transaction(|store| {
            let mut counts = MergeCounts::default();

            let incoming: BTreeSet<&str> = values.iter().map(|(c, _)| c.as_str()).collect();
            for existing in store.ranked_companies(period, financial_name)? {
                if !incoming.contains(existing.as_str()) {
                    store.conn.execute(
                        "DELETE FROM financial_rank_table
                         WHERE report_period = ?1 AND financial_name = ?2 AND company_name = ?3",
                        params![period, financial_name, existing],
                    )?;
                    counts.pruned += 1;
                }
            }

            for (company_name, data) in values {
                store.conn.execute(
                    "INSERT INTO financial_rank_table
                        (report_period, financial_name, company_name, data,
                         ranking, differ_sign, difer_data)
                     VALUES (?1, ?2, ?3, ?4, NULL, NULL, NULL)
                     ON CONFLICT (report_period, financial_name, company_name) DO UPDATE SET
                        data = excluded.data,
                        ranking = NULL,
                        differ_sign = NULL,
                        difer_data = NULL",
                    params![period, financial_name, company_name, data],
                )?;
                counts.written += 1;
            }

            Ok(counts)
        })
    }

    fn ranked_companies(&self, period: ReportPeriod, financial_name: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT company_name FROM financial_rank_table
             WHERE report_period = ?1 AND financial_name = ?2",
        )?;

        let companies = stmt
            .query_map(params![period, financial_name], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(companies)
    }

    /// Ranked facts of a period, ordered by metric, rank and company.
    ///
    /// This is the order report consumers read.
    pub fn ranked_facts(&self, period: ReportPeriod) -> Result<Vec<RankedFact>> {
        let mut stmt = self.conn.prepare(
            "SELECT report_period, financial_name, company_name, data,
                ranking, differ_sign, difer_data
             FROM financial_rank_table
             WHERE report_period = ?1
             ORDER BY financial_name, ranking ASC NULLS LAST, company_name",
        )?;

        let rows = stmt.query_map(params![period], |row| {
            let direction = row
                .get::<_, Option<String>>(5)?
                .map(|s| Direction::from_db_str(&s))
                .transpose()
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            Ok(RankedFact {
                report_period: row.get(0)?,
                financial_name: row.get(1)?,
                company_name: row.get(2)?,
                data: row.get(3)?,
                ranking: row.get(4)?,
                direction,
                rank_delta: row.get(6)?,
            })
        })?;

        let mut facts = Vec::new();
        for row in rows {
            facts.push(row?);
        }

        Ok(facts)
    }

    /// Look up one ranked fact.
    pub fn ranked_fact(
        &self,
        period: ReportPeriod,
        financial_name: &str,
        company_name: &str,
    ) -> Result<Option<RankedFact>> {
        let result = self
            .conn
            .query_row(
                "SELECT data, ranking, differ_sign, difer_data
                 FROM financial_rank_table
                 WHERE report_period = ?1 AND financial_name = ?2 AND company_name = ?3",
                params![period, financial_name, company_name],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, Option<u32>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()?;

        result
            .map(|(data, ranking, sign, rank_delta)| -> Result<RankedFact> {
                Ok(RankedFact {
                    report_period: period,
                    financial_name: financial_name.to_string(),
                    company_name: company_name.to_string(),
                    data,
                    ranking,
                    direction: sign.map(|s| Direction::from_db_str(&s)).transpose()?,
                    rank_delta,
                })
            })
            .transpose()
    }

    /// Set the rank of one ranked fact.
    pub fn set_ranking(
        &self,
        period: ReportPeriod,
        financial_name: &str,
        company_name: &str,
        ranking: u32,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE financial_rank_table SET ranking = ?4
             WHERE report_period = ?1 AND financial_name = ?2 AND company_name = ?3",
            params![period, financial_name, company_name, ranking],
        )?;
        Ok(())
    }

    /// Set the rank delta and direction of one ranked fact.
    pub fn set_rank_delta(
        &self,
        period: ReportPeriod,
        financial_name: &str,
        company_name: &str,
        rank_delta: Option<i64>,
        direction: Direction,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE financial_rank_table SET difer_data = ?4, differ_sign = ?5
             WHERE report_period = ?1 AND financial_name = ?2 AND company_name = ?3",
            params![
                period,
                financial_name,
                company_name,
                rank_delta,
                direction.to_db_str()
            ],
        )?;
        Ok(())
    }

    /// Ranks assigned in a period, keyed by `(financial_name, company_name)`.
    ///
    /// Rows not yet ranked are left out.
    pub fn rankings(&self, period: ReportPeriod) -> Result<HashMap<(String, String), u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT financial_name, company_name, ranking
             FROM financial_rank_table
             WHERE report_period = ?1 AND ranking IS NOT NULL",
        )?;

        let rows = stmt.query_map(params![period], |row| {
            Ok(((row.get(0)?, row.get(1)?), row.get(2)?))
        })?;

        let mut rankings = HashMap::new();
        for row in rows {
            let (key, ranking) = row?;
            rankings.insert(key, ranking);
        }

        Ok(rankings)
    }

    /// Row counts per table.
    pub fn stats(&self) -> Result<StoreStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            usize::try_from(n).map_err(|e| DataError::Parse(e.to_string()))
        };

        let mut raw_facts = 0;
        for table in SourceTable::RAW {
            raw_facts += count(table.table_name())?;
        }

        Ok(StoreStats {
            companies: count("company_info")?,
            raw_facts,
            calculated_metrics: count("calculated_metrics")?,
            ranked_facts: count("financial_rank_table")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn period(year: i32, quarter: u32) -> ReportPeriod {
        ReportPeriod::from_parts(year, quarter).unwrap()
    }

    fn metric(company: &str, roe: f64) -> CalculatedMetric {
        CalculatedMetric {
            report_period: period(2024, 2),
            company_name: company.to_string(),
            quarter_num: 2,
            fiscal_month: Some("12월".to_string()),
            total_equity: 500.0,
            total_assets: 1000.0,
            prev_total_equity: Some(400.0),
            prev_total_assets: Some(800.0),
            net_income: 45.0,
            current_net_income: 45.0,
            prev_net_income: Some(80.0),
            current_q1_net_income: Some(20.0),
            normalization: NormalizationStatus::NotRequired,
            avg_total_assets: Some(900.0),
            avg_total_equity: Some(450.0),
            roa: 10.0,
            roe,
        }
    }

    #[test]
    fn test_store_initialization() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.stats().unwrap(), StoreStats::default());
    }

    #[test]
    fn test_directory_operations() {
        let store = SqliteStore::in_memory().unwrap();

        store.add_company("Beta").unwrap();
        store.add_company("Alpha").unwrap();
        store.add_company("Alpha").unwrap();

        let companies: Vec<_> = store.companies().unwrap().into_iter().collect();
        assert_eq!(companies, vec!["Alpha".to_string(), "Beta".to_string()]);

        assert!(store.remove_company("Beta").unwrap());
        assert!(!store.remove_company("Beta").unwrap());
        assert_eq!(store.companies().unwrap().len(), 1);
    }

    #[test]
    fn test_raw_fact_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let fact = RawFact::new(SourceTable::FinancialCondition, "Alpha", period(2024, 2))
            .value("total_assets", 1000.0)
            .value("total_equity", 500.0)
            .value("net_income", 45.0)
            .label("fiscal_month", "3월");
        store.put_raw_fact(&fact).unwrap();

        let facts = store.balance_sheet_facts(period(2024, 2)).unwrap();
        let alpha = &facts["Alpha"];
        assert_eq!(alpha.total_assets, Some(1000.0));
        assert_eq!(alpha.fiscal_month.as_deref(), Some("3월"));

        assert!(store.balance_sheet_facts(period(2024, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_raw_fact_unknown_column() {
        let store = SqliteStore::in_memory().unwrap();
        let fact = RawFact::new(SourceTable::ManpowerStatus, "Alpha", period(2024, 2))
            .value("total_assets", 1.0);
        let err = store.put_raw_fact(&fact).unwrap_err();
        assert!(err.is_configuration());

        let fact = RawFact::new(SourceTable::CalculatedMetrics, "Alpha", period(2024, 2));
        assert!(store.put_raw_fact(&fact).is_err());
    }

    #[test]
    fn test_batch_rolls_back_on_error() {
        let store = SqliteStore::in_memory().unwrap();
        let good = RawFact::new(SourceTable::ManpowerStatus, "Alpha", period(2024, 2))
            .value("total_employees", 120.0);
        let bad = RawFact::new(SourceTable::ManpowerStatus, "Beta", period(2024, 2))
            .value("no_such_column", 1.0);

        assert!(store.put_raw_facts(&[good, bad]).is_err());
        assert_eq!(store.stats().unwrap().raw_facts, 0);
    }

    #[test]
    fn test_calculated_metric_upsert() {
        let store = SqliteStore::in_memory().unwrap();

        store.upsert_calculated_metric(&metric("Alpha", 20.0)).unwrap();
        store.upsert_calculated_metric(&metric("Alpha", 25.0)).unwrap();

        let metrics = store.calculated_metrics(period(2024, 2)).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_relative_eq!(metrics[0].roe, 25.0);
        assert_eq!(metrics[0].normalization, NormalizationStatus::NotRequired);
        assert_eq!(metrics[0], metric("Alpha", 25.0));
    }

    #[test]
    fn test_calculated_metric_lookup() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_calculated_metric(&metric("Alpha", 20.0)).unwrap();
        store.upsert_calculated_metric(&metric("Beta", 5.0)).unwrap();

        let beta = store.calculated_metric(period(2024, 2), "Beta").unwrap();
        assert_eq!(beta, Some(metric("Beta", 5.0)));
        assert!(store.calculated_metric(period(2024, 2), "Gamma").unwrap().is_none());
        assert!(store.calculated_metric(period(2024, 3), "Alpha").unwrap().is_none());
    }

    #[test]
    fn test_verify_source_against_live_table() {
        let store = SqliteStore::in_memory().unwrap();
        let roe = SourceExpr::column(SourceTable::FinancialRatio, "roe").unwrap();
        let ratio = SourceExpr::column(SourceTable::FinancialRatio, "net_capital_ratio").unwrap();
        store.verify_source(&roe).unwrap();
        store.verify_source(&ratio).unwrap();

        store.conn.execute("DROP TABLE financial_ratio", []).unwrap();
        store
            .conn
            .execute(
                "CREATE TABLE financial_ratio (company_name TEXT, report_period TEXT, roe REAL)",
                [],
            )
            .unwrap();
        store.verify_source(&roe).unwrap();
        let err = store.verify_source(&ratio).unwrap_err();
        assert!(matches!(
            err,
            DataError::UnknownColumn { ref column, .. } if column == "net_capital_ratio"
        ));
        assert!(err.is_configuration());

        store.conn.execute("DROP TABLE financial_ratio", []).unwrap();
        let err = store.verify_source(&roe).unwrap_err();
        assert!(matches!(err, DataError::UnknownTable(_)));
    }

    #[test]
    fn test_metric_values_skip_nulls() {
        let store = SqliteStore::in_memory().unwrap();
        let p = period(2024, 2);
        store
            .put_raw_fact(
                &RawFact::new(SourceTable::OrganizationStructure, "Alpha", p)
                    .value("domestic_sales_offices", 3.0)
                    .value("domestic_branches", 10.0),
            )
            .unwrap();
        store
            .put_raw_fact(
                &RawFact::new(SourceTable::OrganizationStructure, "Beta", p)
                    .value("domestic_branches", 7.0),
            )
            .unwrap();

        let expr = SourceExpr::new(
            SourceTable::OrganizationStructure,
            &["domestic_sales_offices", "domestic_branches"],
        )
        .unwrap();
        let values = store.metric_values(p, &expr).unwrap();
        assert_eq!(values, vec![("Alpha".to_string(), 13.0)]);
    }

    #[test]
    fn test_merge_resets_and_prunes() {
        let store = SqliteStore::in_memory().unwrap();
        let p = period(2024, 2);

        let counts = store
            .merge_ranked_facts(
                p,
                "roe",
                &[("Alpha".to_string(), 5.0), ("Beta".to_string(), 3.0)],
            )
            .unwrap();
        assert_eq!(counts, MergeCounts { written: 2, pruned: 0 });

        store.set_ranking(p, "roe", "Alpha", 1).unwrap();
        store
            .set_rank_delta(p, "roe", "Alpha", Some(2), Direction::Up)
            .unwrap();

        let counts = store
            .merge_ranked_facts(p, "roe", &[("Alpha".to_string(), 6.0)])
            .unwrap();
        assert_eq!(counts, MergeCounts { written: 1, pruned: 1 });

        let facts = store.ranked_facts(p).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].data, 6.0);
        assert_eq!(facts[0].ranking, None);
        assert_eq!(facts[0].direction, None);
        assert_eq!(facts[0].rank_delta, None);
    }

    #[test]
    fn test_ranked_fact_lookup_and_rankings() {
        let store = SqliteStore::in_memory().unwrap();
        let p = period(2024, 2);
        store
            .merge_ranked_facts(
                p,
                "roe",
                &[("Alpha".to_string(), 5.0), ("Beta".to_string(), 3.0)],
            )
            .unwrap();
        store.set_ranking(p, "roe", "Beta", 2).unwrap();

        let rankings = store.rankings(p).unwrap();
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[&("roe".to_string(), "Beta".to_string())], 2);

        let beta = store.ranked_fact(p, "roe", "Beta").unwrap().unwrap();
        assert_eq!(beta.ranking, Some(2));
        assert!(store.ranked_fact(p, "roa", "Beta").unwrap().is_none());
    }

    #[test]
    fn test_in_transaction_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();

        let result: Result<()> = store.in_transaction(|s| {
            s.add_company("Alpha")?;
            Err(DataError::Parse("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(store.companies().unwrap().is_empty());

        store
            .in_transaction(|s| -> Result<()> {
                s.add_company("Alpha")?;
                // nested call joins the outer transaction
                s.put_raw_facts(&[])?;
                Ok(())
            })
            .unwrap();
        assert_eq!(store.companies().unwrap().len(), 1);
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standings.db");
        {
            let store = SqliteStore::new(&path).unwrap();
            store.add_company("Alpha").unwrap();
        }
        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.stats().unwrap().companies, 1);
    }
}
