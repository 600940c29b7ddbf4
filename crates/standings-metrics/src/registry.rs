//! Metric Registry
//!
//! The set of ranked metrics and the source each one is read from. A
//! registry is built once, validated against the raw fact schema, and then
//! only read.

use crate::error::MetricError;
use serde::{Deserialize, Serialize};
use standings_data::{SourceExpr, SourceTable};

/// A ranked metric and where its value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDefinition {
    /// Metric name, stored as `financial_name`
    pub name: String,
    /// Validated source expression
    pub source: SourceExpr,
    /// Brief description of what the metric measures
    pub description: Option<String>,
}

/// Serializable metric declaration, as written in a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Metric name
    pub name: String,
    /// Source table
    pub table: SourceTable,
    /// Source columns; several columns are summed
    pub columns: Vec<String>,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Immutable, validated metric registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRegistry {
    metrics: Vec<MetricDefinition>,
}

impl MetricRegistry {
    /// Start building a registry.
    pub fn builder() -> MetricRegistryBuilder {
        MetricRegistryBuilder::default()
    }

    /// The standard set of ranked metrics.
    pub fn standard() -> Result<Self, MetricError> {
        use SourceTable::*;

        Self::builder()
            .describe(
                "total_equity",
                CalculatedMetrics,
                &["total_equity"],
                "Total equity at period end",
            )
            .describe(
                "net_income",
                CalculatedMetrics,
                &["net_income"],
                "Normalized quarterly net income",
            )
            .describe(
                "total_assets",
                CalculatedMetrics,
                &["total_assets"],
                "Total assets at period end",
            )
            .describe("roe", CalculatedMetrics, &["roe"], "Annualized return on average equity")
            .describe("roa", CalculatedMetrics, &["roa"], "Annualized return on average assets")
            .describe("capital_stock", FinancialCondition, &["capital_stock"], "Paid-in capital")
            .describe(
                "net_capital_ratio",
                FinancialRatio,
                &["net_capital_ratio"],
                "Net capital ratio",
            )
            .describe("total_employees", ManpowerStatus, &["total_employees"], "Headcount")
            .describe(
                "leverage_ratio",
                InvestmentCompanyAnnouncement,
                &["leverage_ratio"],
                "Announced leverage ratio",
            )
            .describe(
                "domestic_locations",
                OrganizationStructure,
                &["domestic_sales_offices", "domestic_branches"],
                "Domestic sales offices plus domestic branches",
            )
            .build()
    }

    /// Build a registry from serialized declarations.
    pub fn from_specs(specs: &[MetricSpec]) -> Result<Self, MetricError> {
        specs
            .iter()
            .fold(Self::builder(), |builder, spec| builder.spec(spec.clone()))
            .build()
    }

    /// Check every registry rule.
    ///
    /// At least one metric; names non-empty and made of `[a-z0-9_]`; names
    /// unique. Sources are validated when definitions are created.
    pub fn validate(&self) -> Result<(), MetricError> {
        if self.metrics.is_empty() {
            return Err(MetricError::EmptyRegistry);
        }
        for (i, metric) in self.metrics.iter().enumerate() {
            validate_name(&metric.name)?;
            if self.metrics[..i].iter().any(|m| m.name == metric.name) {
                return Err(MetricError::DuplicateMetric(metric.name.clone()));
            }
        }
        Ok(())
    }

    /// Look up a metric by name.
    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Whether a metric is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Metrics in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.metrics.iter()
    }

    /// Metric names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name.as_str()).collect()
    }

    /// Number of metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the registry is empty. A validated registry never is.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Serializable declarations of every metric.
    pub fn specs(&self) -> Vec<MetricSpec> {
        self.metrics
            .iter()
            .map(|m| MetricSpec {
                name: m.name.clone(),
                table: m.source.table(),
                columns: m.source.columns().iter().map(|c| c.to_string()).collect(),
                description: m.description.clone(),
            })
            .collect()
    }
}

/// Builder for [`MetricRegistry`].
///
/// Errors are deferred to [`MetricRegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct MetricRegistryBuilder {
    specs: Vec<MetricSpec>,
}

impl MetricRegistryBuilder {
    /// Register a metric.
    pub fn metric<S: AsRef<str>>(mut self, name: &str, table: SourceTable, columns: &[S]) -> Self {
        self.specs.push(MetricSpec {
            name: name.to_string(),
            table,
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            description: None,
        });
        self
    }

    /// Register a metric with a description.
    pub fn describe<S: AsRef<str>>(
        self,
        name: &str,
        table: SourceTable,
        columns: &[S],
        description: &str,
    ) -> Self {
        let mut builder = self.metric(name, table, columns);
        if let Some(last) = builder.specs.last_mut() {
            last.description = Some(description.to_string());
        }
        builder
    }

    /// Register a serialized declaration.
    pub fn spec(mut self, spec: MetricSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Resolve every source and validate the registry.
    pub fn build(self) -> Result<MetricRegistry, MetricError> {
        let metrics = self
            .specs
            .into_iter()
            .map(|spec| {
                validate_name(&spec.name)?;
                let source = SourceExpr::new(spec.table, &spec.columns).map_err(|source| {
                    MetricError::InvalidSource {
                        metric: spec.name.clone(),
                        source,
                    }
                })?;
                Ok(MetricDefinition {
                    name: spec.name,
                    source,
                    description: spec.description,
                })
            })
            .collect::<Result<Vec<_>, MetricError>>()?;

        let registry = MetricRegistry { metrics };
        registry.validate()?;
        Ok(registry)
    }
}

fn validate_name(name: &str) -> Result<(), MetricError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MetricError::InvalidName(name.to_string()))
    }
}
