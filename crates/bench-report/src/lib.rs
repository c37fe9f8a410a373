//! Cross-protocol comparison of benchmark reports.

use bench_types::{ApiReport, Protocol};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
	#[error("Unknown metric: {0} (expected net-fee, effective-value or latency)")]
	UnknownMetric(String),
}

/// What to rank reports by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
	/// Total fee plus gas in USD. Lower is better.
	#[default]
	NetFee,
	/// Output value net of gas in USD. Higher is better.
	EffectiveValue,
	/// Total query latency in milliseconds. Lower is better.
	Latency,
}

impl Metric {
	fn value(&self, report: &ApiReport) -> Decimal {
		match self {
			Metric::NetFee => report.net_fee.amount_usd,
			Metric::EffectiveValue => report.trade_value.effective_trade_value_usd_with_gas,
			Metric::Latency => Decimal::from(report.total_query_latency()),
		}
	}

	fn higher_is_better(&self) -> bool {
		matches!(self, Metric::EffectiveValue)
	}
}

impl fmt::Display for Metric {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Metric::NetFee => "net-fee",
			Metric::EffectiveValue => "effective-value",
			Metric::Latency => "latency",
		})
	}
}

impl FromStr for Metric {
	type Err = ReportError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"net-fee" => Ok(Metric::NetFee),
			"effective-value" => Ok(Metric::EffectiveValue),
			"latency" => Ok(Metric::Latency),
			other => Err(ReportError::UnknownMetric(other.to_string())),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct Ranking {
	#[tabled(rename = "Rank")]
	pub rank: usize,
	#[tabled(rename = "Protocol")]
	pub protocol: Protocol,
	#[tabled(rename = "Route")]
	pub aggregator: String,
	#[tabled(rename = "Value")]
	pub value: Decimal,
	#[tabled(rename = "Report")]
	pub report_id: String,
}

/// Ranks reports by `metric`. Equal values share a rank and keep input order.
pub fn compare(reports: &[ApiReport], metric: Metric) -> Vec<Ranking> {
	let mut scored: Vec<(Decimal, &ApiReport)> = reports.iter().map(|r| (metric.value(r), r)).collect();
	// sort_by is stable
	if metric.higher_is_better() {
		scored.sort_by(|a, b| b.0.cmp(&a.0));
	} else {
		scored.sort_by(|a, b| a.0.cmp(&b.0));
	}

	let mut rankings: Vec<Ranking> = Vec::with_capacity(scored.len());
	for (position, (value, report)) in scored.into_iter().enumerate() {
		let rank = match rankings.last() {
			Some(previous) if previous.value == value => previous.rank,
			_ => position + 1,
		};
		rankings.push(Ranking {
			rank,
			protocol: report.protocol,
			aggregator: report.aggregator.name.clone(),
			value,
			report_id: report.id.to_string(),
		});
	}
	rankings
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ProtocolSummary {
	#[tabled(rename = "Protocol")]
	pub protocol: Protocol,
	#[tabled(rename = "Reports")]
	pub reports: usize,
	#[tabled(rename = "Mean latency (ms)")]
	pub mean_latency_ms: Decimal,
	#[tabled(rename = "Mean net fee (USD)")]
	pub mean_net_fee_usd: Decimal,
	#[tabled(rename = "Best value with gas (USD)")]
	pub best_effective_value_usd: Decimal,
}

/// Per-protocol averages, in order of each protocol's first report.
pub fn summarize(reports: &[ApiReport]) -> Vec<ProtocolSummary> {
	let mut protocols: Vec<Protocol> = Vec::new();
	for report in reports {
		if !protocols.contains(&report.protocol) {
			protocols.push(report.protocol);
		}
	}

	protocols
		.into_iter()
		.map(|protocol| {
			let group: Vec<&ApiReport> = reports.iter().filter(|r| r.protocol == protocol).collect();
			let count = Decimal::from(group.len());
			let latency: Decimal = group.iter().map(|r| Decimal::from(r.total_query_latency())).sum();
			let net_fee: Decimal = group.iter().map(|r| r.net_fee.amount_usd).sum();
			let best = group
				.iter()
				.map(|r| r.trade_value.effective_trade_value_usd_with_gas)
				.max()
				.unwrap_or_default();

			ProtocolSummary {
				protocol,
				reports: group.len(),
				mean_latency_ms: (latency / count).round_dp(0),
				mean_net_fee_usd: (net_fee / count).round_dp(2),
				best_effective_value_usd: best,
			}
		})
		.collect()
}

pub fn render_rankings(rankings: &[Ranking]) -> String {
	Table::new(rankings).with(Style::rounded()).to_string()
}

pub fn render_summary(summary: &[ProtocolSummary]) -> String {
	Table::new(summary).with(Style::rounded()).to_string()
}
