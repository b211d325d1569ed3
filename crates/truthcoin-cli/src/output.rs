// crates/truthcoin-cli/src/output.rs
//
// Output formatting for the resolver.
// Supports table and JSON output modes.

use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled};
use truthcoin_consensus::{ResolutionParams, SessionOutcome};

use crate::config::Scenario;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Per-voter results, named.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoterReport {
    pub name: String,
    pub old_rep: f64,
    pub this_rep: f64,
    pub smoothed_rep: f64,
    pub na_count: f64,
    pub participation: f64,
    pub row_bonus: f64,
}

/// Per-decision results, named, with the outcome in the decision's own units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionReport {
    pub name: String,
    pub scaled: bool,
    pub first_loading: f64,
    pub raw_outcome: f64,
    pub final_outcome: f64,
    pub outcome: f64,
    pub certainty: f64,
    pub participation: f64,
    pub author_bonus: f64,
}

/// Everything printed for a resolved scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionReport {
    pub params: ResolutionParams,
    pub svd_converged: bool,
    pub voters: Vec<VoterReport>,
    pub decisions: Vec<DecisionReport>,
}

impl ResolutionReport {
    pub fn new(scenario: &Scenario, params: ResolutionParams, outcome: &SessionOutcome) -> Self {
        let v = &outcome.voters;
        let voters = scenario
            .voters
            .iter()
            .enumerate()
            .map(|(i, voter)| VoterReport {
                name: voter.name.clone(),
                old_rep: voter.reputation,
                this_rep: v.this_rep[i],
                smoothed_rep: v.smoothed_rep[i],
                na_count: v.na_count[i],
                participation: v.participation[i],
                row_bonus: v.row_bonus[i],
            })
            .collect();

        let d = &outcome.decisions;
        let decisions = scenario
            .decisions
            .iter()
            .enumerate()
            .map(|(j, decision)| DecisionReport {
                name: decision.name.clone(),
                scaled: decision.scaled,
                first_loading: d.first_loading[j],
                raw_outcome: d.raw_outcome[j],
                final_outcome: d.final_outcome[j],
                outcome: decision.denormalize(d.final_outcome[j]),
                certainty: d.certainty[j],
                participation: d.participation[j],
                author_bonus: d.author_bonus[j],
            })
            .collect();

        Self {
            params,
            svd_converged: outcome.svd_converged,
            voters,
            decisions,
        }
    }

    /// Render in the requested format.
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => format_json(self),
            OutputFormat::Table => {
                let voters: Vec<VoterRow> = self.voters.iter().map(VoterRow::from).collect();
                let decisions: Vec<DecisionRow> =
                    self.decisions.iter().map(DecisionRow::from).collect();
                let mut out = String::new();
                out.push_str(&format!(
                    "alpha: {}  |  tol: {}  |  SVD converged: {}\n\n",
                    self.params.alpha, self.params.tol, self.svd_converged
                ));
                out.push_str("Voters\n");
                out.push_str(&format_table(&voters));
                out.push_str("\n\nDecisions\n");
                out.push_str(&format_table(&decisions));
                out
            }
        }
    }
}

fn fmt_value(value: f64) -> String {
    format!("{:.6}", value)
}

#[derive(Tabled)]
struct VoterRow {
    #[tabled(rename = "Voter")]
    name: String,
    #[tabled(rename = "Old Rep")]
    old_rep: String,
    #[tabled(rename = "This Rep")]
    this_rep: String,
    #[tabled(rename = "Smoothed Rep")]
    smoothed_rep: String,
    #[tabled(rename = "NA")]
    na_count: String,
    #[tabled(rename = "Participation")]
    participation: String,
    #[tabled(rename = "Row Bonus")]
    row_bonus: String,
}

impl From<&VoterReport> for VoterRow {
    fn from(r: &VoterReport) -> Self {
        Self {
            name: r.name.clone(),
            old_rep: fmt_value(r.old_rep),
            this_rep: fmt_value(r.this_rep),
            smoothed_rep: fmt_value(r.smoothed_rep),
            na_count: format!("{}", r.na_count),
            participation: fmt_value(r.participation),
            row_bonus: fmt_value(r.row_bonus),
        }
    }
}

#[derive(Tabled)]
struct DecisionRow {
    #[tabled(rename = "Decision")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "1st Loading")]
    first_loading: String,
    #[tabled(rename = "Raw")]
    raw_outcome: String,
    #[tabled(rename = "Final")]
    final_outcome: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Certainty")]
    certainty: String,
    #[tabled(rename = "Participation")]
    participation: String,
    #[tabled(rename = "Author Bonus")]
    author_bonus: String,
}

impl From<&DecisionReport> for DecisionRow {
    fn from(r: &DecisionReport) -> Self {
        Self {
            name: r.name.clone(),
            kind: if r.scaled { "scaled" } else { "binary" }.to_string(),
            first_loading: fmt_value(r.first_loading),
            raw_outcome: fmt_value(r.raw_outcome),
            final_outcome: fmt_value(r.final_outcome),
            outcome: format!("{}", r.outcome),
            certainty: fmt_value(r.certainty),
            participation: fmt_value(r.participation),
            author_bonus: fmt_value(r.author_bonus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> ResolutionReport {
        ResolutionReport {
            params: ResolutionParams::default(),
            svd_converged: true,
            voters: vec![VoterReport {
                name: "alice".to_string(),
                old_rep: 0.5,
                this_rep: 0.75,
                smoothed_rep: 0.525,
                na_count: 0.0,
                participation: 1.0,
                row_bonus: 0.525,
            }],
            decisions: vec![DecisionReport {
                name: "price".to_string(),
                scaled: true,
                first_loading: -0.7,
                raw_outcome: 0.5,
                final_outcome: 0.5,
                outcome: 150.0,
                certainty: 1.0,
                participation: 1.0,
                author_bonus: 1.0,
            }],
        }
    }

    #[test]
    fn test_table_output_names_rows() {
        let out = sample_report().render(OutputFormat::Table);
        assert!(out.contains("alice"));
        assert!(out.contains("Smoothed Rep"));
        assert!(out.contains("price"));
        assert!(out.contains("scaled"));
        assert!(out.contains("150"));
        assert!(out.contains("0.525000"));
    }

    #[test]
    fn test_json_output_parses() {
        let out = sample_report().render(OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["voters"][0]["name"], "alice");
        assert_eq!(value["decisions"][0]["outcome"], 150.0);
        assert_eq!(value["svd_converged"], true);
    }
}
