//! Raw fact schema.
//!
//! The closed set of tables and numeric columns a ranked metric may be
//! sourced from. Metric queries are assembled only from the identifiers
//! listed here, never from caller-supplied text.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A table a metric value can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    /// Metrics computed by the engine itself.
    CalculatedMetrics,
    /// Balance-sheet and income facts.
    FinancialCondition,
    /// Disclosed ratio facts.
    FinancialRatio,
    /// Headcount facts.
    ManpowerStatus,
    /// Leverage-ratio announcements.
    InvestmentCompanyAnnouncement,
    /// Organizational-structure facts.
    OrganizationStructure,
}

impl SourceTable {
    /// Every source table.
    pub const ALL: [Self; 6] = [
        Self::CalculatedMetrics,
        Self::FinancialCondition,
        Self::FinancialRatio,
        Self::ManpowerStatus,
        Self::InvestmentCompanyAnnouncement,
        Self::OrganizationStructure,
    ];

    /// The raw tables populated by ingestion.
    pub const RAW: [Self; 5] = [
        Self::FinancialCondition,
        Self::FinancialRatio,
        Self::ManpowerStatus,
        Self::InvestmentCompanyAnnouncement,
        Self::OrganizationStructure,
    ];

    /// SQL table name.
    pub const fn table_name(&self) -> &'static str {
        match self {
            Self::CalculatedMetrics => "calculated_metrics",
            Self::FinancialCondition => "financial_condition",
            Self::FinancialRatio => "financial_ratio",
            Self::ManpowerStatus => "manpower_status",
            Self::InvestmentCompanyAnnouncement => "investment_company_announcement",
            Self::OrganizationStructure => "organization_structure",
        }
    }

    /// Parse a table name.
    pub fn from_table_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.table_name() == name)
            .ok_or_else(|| DataError::UnknownTable(name.to_string()))
    }

    /// Numeric columns a metric may reference.
    pub const fn numeric_columns(&self) -> &'static [&'static str] {
        match self {
            Self::CalculatedMetrics => &[
                "total_equity",
                "total_assets",
                "net_income",
                "avg_total_assets",
                "avg_total_equity",
                "roa",
                "roe",
            ],
            Self::FinancialCondition => &[
                "net_income",
                "total_liabilities",
                "operating_revenue",
                "operating_expenses",
                "operating_profit",
                "capital_stock",
                "total_equity",
                "total_assets",
            ],
            Self::FinancialRatio => &[
                "roa",
                "roe",
                "debt_ratio",
                "net_capital_ratio",
                "operating_net_capital_ratio",
                "equity_ratio",
            ],
            Self::ManpowerStatus => &[
                "auditor_count",
                "executive_count",
                "contract_staff_count",
                "other_staff_count",
                "non_registered_executive_count",
                "outside_director_count",
                "total_employees",
                "regular_staff_count",
                "investment_advisor_count",
            ],
            Self::InvestmentCompanyAnnouncement => &["leverage_ratio"],
            Self::OrganizationStructure => &[
                "domestic_sales_offices",
                "domestic_branches",
                "headquarters_departments",
                "total_units",
                "overseas_offices",
                "overseas_branches",
                "overseas_local_entities",
            ],
        }
    }

    /// Text columns carried alongside the numeric facts.
    pub const fn text_columns(&self) -> &'static [&'static str] {
        match self {
            Self::CalculatedMetrics => &["fiscal_month", "normalization"],
            Self::FinancialCondition | Self::FinancialRatio => &["fiscal_month", "industry_type"],
            Self::ManpowerStatus | Self::OrganizationStructure => &["industry_type"],
            Self::InvestmentCompanyAnnouncement => &["reference_date", "correction_status"],
        }
    }

    /// Resolve a numeric column name to its schema identifier.
    pub fn numeric_column(&self, name: &str) -> Result<&'static str> {
        self.numeric_columns()
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| self.unknown_column(name))
    }

    /// Resolve a text column name to its schema identifier.
    pub fn text_column(&self, name: &str) -> Result<&'static str> {
        self.text_columns()
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| self.unknown_column(name))
    }

    fn unknown_column(&self, name: &str) -> DataError {
        DataError::UnknownColumn {
            table: self.table_name().to_string(),
            column: name.to_string(),
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A validated metric source: one column, or the sum of several columns, of
/// one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceExpr {
    table: SourceTable,
    columns: Vec<&'static str>,
}

impl SourceExpr {
    /// Build an expression, checking every column against the table schema.
    pub fn new<S: AsRef<str>>(table: SourceTable, columns: &[S]) -> Result<Self> {
        if columns.is_empty() {
            return Err(DataError::UnknownColumn {
                table: table.table_name().to_string(),
                column: String::new(),
            });
        }
        let columns = columns
            .iter()
            .map(|c| table.numeric_column(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { table, columns })
    }

    /// Single-column expression.
    pub fn column(table: SourceTable, column: &str) -> Result<Self> {
        Self::new(table, &[column])
    }

    /// Source table.
    pub const fn table(&self) -> SourceTable {
        self.table
    }

    /// Referenced columns.
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    /// SQL value expression, e.g. `domestic_sales_offices + domestic_branches`.
    ///
    /// A NULL in any referenced column makes the whole value NULL.
    pub fn value_sql(&self) -> String {
        self.columns.join(" + ")
    }

    /// Parameterized query selecting `(company_name, value)` for one period
    /// (`?1`), excluding rows whose value is NULL.
    pub fn select_sql(&self) -> String {
        let value = self.value_sql();
        format!(
            "SELECT company_name, {value} AS value FROM {table}
             WHERE report_period = ?1 AND ({value}) IS NOT NULL
             ORDER BY company_name",
            table = self.table.table_name(),
        )
    }
}

impl fmt::Display for SourceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.({})", self.table, self.value_sql())
    }
}
