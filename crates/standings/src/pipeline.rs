//! Ranking pipeline.
//!
//! A run for one report period executes four phases in order: compute
//! calculated metrics, collect ranked facts, rank, and diff against the
//! same quarter a year earlier. Each phase commits as one transaction; a
//! failure rolls back that phase's writes and ends the run.

use crate::directory::CompanyDirectory;
use crate::error::{EngineError, Result};
use serde::Serialize;
use standings_data::{
    BalanceSheetFact, CalculatedMetric, NormalizationStatus, Quarter, ReportPeriod, SqliteStore,
};
use standings_metrics::{
    BalanceInputs, FiscalMonth, MetricRegistry, NetIncomeInputs, normalize_net_income,
    rank_changes, rank_partitions, return_ratios,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Outcome of the compute phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComputeSummary {
    /// Calculated metrics written
    pub computed: usize,
    /// Companies skipped for missing inputs
    pub skipped: usize,
    /// March fiscal-year companies whose net income could not be normalized
    pub unnormalized: usize,
}

/// Outcome of the collect phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectSummary {
    /// Metrics collected
    pub metrics: usize,
    /// Ranked facts written
    pub written: usize,
    /// Stale ranked facts removed
    pub pruned: usize,
    /// Values dropped because the company is not in the directory
    pub excluded: usize,
}

/// Outcome of the rank phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankSummary {
    /// Ranked facts assigned a rank
    pub ranked: usize,
}

/// Outcome of the diff phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Ranked facts with a prior-year rank
    pub compared: usize,
    /// Ranked facts without a prior-year rank
    pub unknown: usize,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Period processed
    pub period: ReportPeriod,
    /// Compute phase
    pub compute: ComputeSummary,
    /// Collect phase
    pub collect: CollectSummary,
    /// Rank phase
    pub rank: RankSummary,
    /// Diff phase
    pub diff: DiffSummary,
}

/// Runs the ranking pipeline against a store.
///
/// Concurrent runs for the same period must be serialized by the caller.
#[derive(Debug)]
pub struct RankingEngine<'a, D> {
    store: &'a SqliteStore,
    registry: MetricRegistry,
    directory: D,
}

impl<'a, D: CompanyDirectory> RankingEngine<'a, D> {
    /// Create an engine, validating the metric registry against the
    /// registry rules and the store's live tables.
    pub fn new(store: &'a SqliteStore, registry: MetricRegistry, directory: D) -> Result<Self> {
        registry.validate()?;
        for metric in registry.iter() {
            store.verify_source(&metric.source)?;
        }
        Ok(Self {
            store,
            registry,
            directory,
        })
    }

    /// Metric registry in use.
    pub const fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Run every phase for one period.
    pub fn run(&self, period: ReportPeriod) -> Result<RunSummary> {
        info!(%period, "starting ranking run");

        let summary = RunSummary {
            period,
            compute: self.compute_metrics(period)?,
            collect: self.collect(period)?,
            rank: self.rank(period)?,
            diff: self.diff(period)?,
        };

        info!(%period, "ranking run complete");
        Ok(summary)
    }

    /// Normalize net income and compute return ratios for every directory
    /// company.
    ///
    /// Companies lacking total assets, total equity or net income are skipped,
    /// including those with no balance-sheet facts for `period` at all.
    pub fn compute_metrics(&self, period: ReportPeriod) -> Result<ComputeSummary> {
        self.store.in_transaction(|store| {
            let directory = self.directory.companies()?;
            let current = store.balance_sheet_facts(period)?;
            let prior = store.balance_sheet_facts(period.prior_fiscal_year_end())?;
            let first = if period.quarter() == Quarter::Q1 {
                HashMap::new()
            } else {
                store.balance_sheet_facts(period.first_quarter())?
            };

            let mut summary = ComputeSummary::default();
            for company in &directory {
                let outcome = match current.get(company) {
                    Some(fact) => calculate(period, fact, prior.get(company), first.get(company)),
                    None => Err(EngineError::MissingInputData {
                        company: company.clone(),
                        period,
                        field: "total_assets",
                    }),
                };

                match outcome {
                    Ok(metric) => {
                        if metric.normalization == NormalizationStatus::Unnormalized {
                            warn!(
                                %period,
                                company = %company,
                                "net income left cumulative, baseline missing"
                            );
                            summary.unnormalized += 1;
                        }
                        store.upsert_calculated_metric(&metric)?;
                        summary.computed += 1;
                    }
                    Err(err) if err.is_skippable() => {
                        warn!(%period, "skipping company: {}", err);
                        summary.skipped += 1;
                    }
                    Err(err) => return Err(err),
                }
            }

            info!(
                %period,
                computed = summary.computed,
                skipped = summary.skipped,
                unnormalized = summary.unnormalized,
                "calculated metrics"
            );
            Ok(summary)
        })
    }

    /// Collect every registered metric into the ranked fact table.
    ///
    /// Only directory companies are collected; ranking state of written rows
    /// is reset.
    pub fn collect(&self, period: ReportPeriod) -> Result<CollectSummary> {
        self.store.in_transaction(|store| {
            let directory = self.directory.companies()?;
            let mut summary = CollectSummary::default();

            for metric in self.registry.iter() {
                let values = store.metric_values(period, &metric.source)?;
                let total = values.len();
                let values: Vec<(String, f64)> = values
                    .into_iter()
                    .filter(|(company, _)| directory.contains(company))
                    .collect();

                let counts = store.merge_ranked_facts(period, &metric.name, &values)?;
                debug!(
                    %period,
                    metric = %metric.name,
                    source = %metric.source,
                    written = counts.written,
                    pruned = counts.pruned,
                    "collected metric"
                );

                summary.metrics += 1;
                summary.written += counts.written;
                summary.pruned += counts.pruned;
                summary.excluded += total - values.len();
            }

            info!(
                %period,
                metrics = summary.metrics,
                written = summary.written,
                pruned = summary.pruned,
                excluded = summary.excluded,
                "collected ranked facts"
            );
            Ok(summary)
        })
    }

    /// Rank every metric of the period, highest value first.
    pub fn rank(&self, period: ReportPeriod) -> Result<RankSummary> {
        self.store.in_transaction(|store| {
            let facts = store.ranked_facts(period)?;
            let assignments = rank_partitions(&facts);

            for assignment in &assignments {
                store.set_ranking(
                    period,
                    &assignment.financial_name,
                    &assignment.company_name,
                    assignment.ranking,
                )?;
            }

            let summary = RankSummary {
                ranked: assignments.len(),
            };
            info!(%period, ranked = summary.ranked, "ranked facts");
            Ok(summary)
        })
    }

    /// Record rank changes against the same quarter one year earlier.
    pub fn diff(&self, period: ReportPeriod) -> Result<DiffSummary> {
        let previous_period = period.same_quarter_prior_year();

        self.store.in_transaction(|store| {
            let current = store.rankings(period)?;
            let previous = store.rankings(previous_period)?;

            let mut summary = DiffSummary::default();
            for change in rank_changes(&current, &previous) {
                store.set_rank_delta(
                    period,
                    &change.financial_name,
                    &change.company_name,
                    change.rank_delta,
                    change.direction,
                )?;
                if change.rank_delta.is_some() {
                    summary.compared += 1;
                } else {
                    summary.unknown += 1;
                }
            }

            info!(
                %period,
                previous = %previous_period,
                compared = summary.compared,
                unknown = summary.unknown,
                "computed rank changes"
            );
            Ok(summary)
        })
    }
}

fn require(
    value: Option<f64>,
    fact: &BalanceSheetFact,
    period: ReportPeriod,
    field: &'static str,
) -> Result<f64> {
    value.ok_or_else(|| EngineError::MissingInputData {
        company: fact.company_name.clone(),
        period,
        field,
    })
}

/// Build the calculated metric of one company.
fn calculate(
    period: ReportPeriod,
    fact: &BalanceSheetFact,
    prior_year_end: Option<&BalanceSheetFact>,
    first_quarter: Option<&BalanceSheetFact>,
) -> Result<CalculatedMetric> {
    let total_assets = require(fact.total_assets, fact, period, "total_assets")?;
    let total_equity = require(fact.total_equity, fact, period, "total_equity")?;
    let current_net_income = require(fact.net_income, fact, period, "net_income")?;

    let quarter = period.quarter();
    let prev_net_income = prior_year_end.and_then(|f| f.net_income);
    let current_q1_net_income = match first_quarter {
        Some(first) => first.net_income,
        None if quarter == Quarter::Q1 => Some(current_net_income),
        None => None,
    };

    let normalized = normalize_net_income(&NetIncomeInputs {
        fiscal_month: FiscalMonth::from_label(fact.fiscal_month.as_deref()),
        quarter,
        current: current_net_income,
        current_q1: current_q1_net_income,
        prior_q4: prev_net_income,
    });

    let balances = BalanceInputs {
        total_assets,
        total_equity,
        prev_total_assets: prior_year_end.and_then(|f| f.total_assets),
        prev_total_equity: prior_year_end.and_then(|f| f.total_equity),
    };
    let ratios = return_ratios(normalized.value, &balances, quarter);

    Ok(CalculatedMetric {
        report_period: period,
        company_name: fact.company_name.clone(),
        quarter_num: quarter.number(),
        fiscal_month: fact.fiscal_month.clone(),
        total_equity,
        total_assets,
        prev_total_equity: balances.prev_total_equity,
        prev_total_assets: balances.prev_total_assets,
        net_income: normalized.value,
        current_net_income,
        prev_net_income,
        current_q1_net_income,
        normalization: normalized.status,
        avg_total_assets: ratios.avg_total_assets,
        avg_total_equity: ratios.avg_total_equity,
        roa: ratios.roa.stored_value(),
        roe: ratios.roe.stored_value(),
    })
}
