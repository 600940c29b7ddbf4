//! CSV import of raw facts.
//!
//! One row per company. The header names the columns: `company_name` is
//! required, every other column must belong to the target table's schema.
//! Empty cells are left unset.

use csv::StringRecord;
use standings_data::{DataError, RawFact, ReportPeriod, SourceTable};
use std::io::Read;
use thiserror::Error;

/// Errors raised while reading a raw fact file.
#[derive(Debug, Error)]
pub(crate) enum ImportError {
    /// CSV could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Column is not part of the table's schema.
    #[error(transparent)]
    Schema(#[from] DataError),

    /// Header has no `company_name` column.
    #[error("Missing company_name column")]
    MissingCompanyColumn,

    /// Numeric cell could not be parsed.
    #[error("Line {line}: invalid number {value:?} in column {column}")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },
}

enum Column {
    Company,
    Numeric(&'static str),
    Text(&'static str),
}

fn resolve_columns(table: SourceTable, headers: &StringRecord) -> Result<Vec<Column>, ImportError> {
    let columns = headers
        .iter()
        .map(|header| {
            let header = header.trim();
            if header == "company_name" {
                Ok(Column::Company)
            } else if let Ok(column) = table.numeric_column(header) {
                Ok(Column::Numeric(column))
            } else {
                Ok(Column::Text(table.text_column(header)?))
            }
        })
        .collect::<Result<Vec<_>, ImportError>>()?;

    if columns.iter().any(|c| matches!(c, Column::Company)) {
        Ok(columns)
    } else {
        Err(ImportError::MissingCompanyColumn)
    }
}

/// Parse raw facts for one table and period from CSV.
pub(crate) fn read_raw_facts<R: Read>(
    reader: R,
    table: SourceTable,
    period: ReportPeriod,
) -> Result<Vec<RawFact>, ImportError> {
    if table == SourceTable::CalculatedMetrics {
        return Err(DataError::UnknownTable(format!("{table} is not a raw fact table")).into());
    }

    let mut rdr = csv::Reader::from_reader(reader);
    let columns = resolve_columns(table, rdr.headers()?)?;

    let mut facts = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());

        let mut company = None;
        let mut values = Vec::new();
        let mut labels = Vec::new();
        for (column, cell) in columns.iter().zip(record.iter()) {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            match column {
                Column::Company => company = Some(cell.to_string()),
                Column::Numeric(name) => {
                    let value = cell.replace(',', "").parse::<f64>().map_err(|_| {
                        ImportError::InvalidNumber {
                            line,
                            column: name.to_string(),
                            value: cell.to_string(),
                        }
                    })?;
                    values.push((*name, value));
                }
                Column::Text(name) => labels.push((*name, cell.to_string())),
            }
        }

        let Some(company) = company else {
            tracing::warn!(line, "skipping row without company name");
            continue;
        };

        let fact = values
            .into_iter()
            .fold(RawFact::new(table, company, period), |f, (c, v)| f.value(c, v));
        let fact = labels
            .into_iter()
            .fold(fact, |f, (c, l)| f.label(c, l));
        facts.push(fact);
    }

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> ReportPeriod {
        ReportPeriod::from_parts(2024, 2).unwrap()
    }

    #[test]
    fn test_read_financial_condition() {
        let data = "company_name,fiscal_month,total_assets,total_equity,net_income\n\
                    Alpha,3월,\"1,000\",400,120\n\
                    Beta,12월,2200,,60\n";
        let facts =
            read_raw_facts(data.as_bytes(), SourceTable::FinancialCondition, period()).unwrap();

        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].company_name, "Alpha");
        assert_eq!(facts[0].values["total_assets"], 1000.0);
        assert_eq!(facts[0].labels["fiscal_month"], "3월");
        assert!(!facts[1].values.contains_key("total_equity"));
        assert_eq!(facts[1].report_period, period());
    }

    #[test]
    fn test_unknown_column() {
        let data = "company_name,headcount\nAlpha,10\n";
        let err =
            read_raw_facts(data.as_bytes(), SourceTable::ManpowerStatus, period()).unwrap_err();
        assert!(matches!(err, ImportError::Schema(DataError::UnknownColumn { .. })));
    }

    #[test]
    fn test_missing_company_column() {
        let data = "total_employees\n10\n";
        let err =
            read_raw_facts(data.as_bytes(), SourceTable::ManpowerStatus, period()).unwrap_err();
        assert!(matches!(err, ImportError::MissingCompanyColumn));
    }

    #[test]
    fn test_invalid_number() {
        let data = "company_name,total_employees\nAlpha,many\n";
        let err =
            read_raw_facts(data.as_bytes(), SourceTable::ManpowerStatus, period()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidNumber { line: 2, .. }));
    }

    #[test]
    fn test_calculated_metrics_rejected() {
        let data = "company_name,roe\nAlpha,1\n";
        assert!(read_raw_facts(data.as_bytes(), SourceTable::CalculatedMetrics, period()).is_err());
    }

    #[test]
    fn test_rows_without_company_skipped() {
        let data = "company_name,total_employees\n,10\nBeta,20\n";
        let facts = read_raw_facts(data.as_bytes(), SourceTable::ManpowerStatus, period()).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].company_name, "Beta");
    }
}
