//! Human-readable rendering of prediction outcomes

use super::inference::Outcome;
use crate::features::EncodedVector;
use crate::profiles::OutcomeLabels;
use crate::{FormcastError, OutputConfig, Result};

/// Format an amount as `$1,234.56`; negatives read `-$1,234.56`
pub fn format_currency(value: f64, symbol: &str) -> String {
    let cents = (value.abs() * 100.0).round();
    let frac = (cents % 100.0) as u64;
    let digits = format!("{:.0}", (cents / 100.0).trunc());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0.0 { "-" } else { "" };
    format!("{}{}{}.{:02}", sign, symbol, grouped, frac)
}

/// Probability as a percentage with `precision` decimals
pub fn format_probability(probability: f64, precision: usize) -> String {
    format!("{:.*}%", precision, probability * 100.0)
}

/// Display text for a class index
pub fn label_text(label: u32, labels: &OutcomeLabels) -> String {
    match label {
        0 => labels.negative.clone(),
        1 => labels.positive.clone(),
        n => format!("class {}", n),
    }
}

/// One-line summary of an outcome
pub fn summarize(outcome: &Outcome, labels: &OutcomeLabels, output: &OutputConfig) -> String {
    match outcome {
        Outcome::Value { value } => format_currency(*value, &output.currency_symbol),
        Outcome::Label {
            label,
            probability: Some(p),
        } => format!(
            "{} ({})",
            label_text(*label, labels),
            format_probability(*p, output.probability_precision)
        ),
        Outcome::Label {
            label,
            probability: None,
        } => label_text(*label, labels),
        Outcome::Decision {
            decision,
            probability,
            ..
        } => format!(
            "{} ({})",
            if *decision {
                &labels.positive
            } else {
                &labels.negative
            },
            format_probability(*probability, output.probability_precision)
        ),
    }
}

fn write_csv(rows: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| FormcastError::Parse(format!("Failed to write CSV: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| FormcastError::Parse(format!("Failed to write CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| FormcastError::Parse(e.to_string()))
}

/// Header row of column names, then one row of values
pub fn encoded_csv(vector: &EncodedVector) -> Result<String> {
    let (columns, values): (Vec<String>, Vec<String>) = vector
        .iter()
        .map(|(column, value)| (column.to_string(), value.to_string()))
        .unzip();
    write_csv(&[columns, values])
}

/// `profile,kind,value,probability,threshold` header plus one outcome row
pub fn outcome_csv(
    profile: &str,
    outcome: &Outcome,
    labels: &OutcomeLabels,
    output: &OutputConfig,
) -> Result<String> {
    let (kind, value, threshold) = match outcome {
        Outcome::Value { value } => ("value", value.to_string(), String::new()),
        Outcome::Label { label, .. } => ("label", label_text(*label, labels), String::new()),
        Outcome::Decision {
            decision,
            threshold,
            ..
        } => (
            "decision",
            label_text(u32::from(*decision), labels),
            threshold.to_string(),
        ),
    };
    let probability = outcome
        .probability()
        .map(|p| format_probability(p, output.probability_precision))
        .unwrap_or_default();

    let header = ["profile", "kind", "value", "probability", "threshold"];
    write_csv(&[
        header.iter().map(|h| h.to_string()).collect(),
        vec![profile.to_string(), kind.to_string(), value, probability, threshold],
    ])
}

/// Boxed result panel for terminal output
pub fn format_outcome(
    title: &str,
    outcome: &Outcome,
    labels: &OutcomeLabels,
    output: &OutputConfig,
) -> String {
    let mut lines = vec![format!("│  {}", title)];
    lines.push("├─────────────────────────────────────────────────┤".to_string());

    match outcome {
        Outcome::Value { value } => {
            lines.push(format!(
                "│  Estimate:     {}",
                format_currency(*value, &output.currency_symbol)
            ));
        }
        Outcome::Label { label, probability } => {
            lines.push(format!("│  Prediction:   {}", label_text(*label, labels)));
            if let Some(p) = probability {
                lines.push(format!(
                    "│  Probability:  {}",
                    format_probability(*p, output.probability_precision)
                ));
            }
        }
        Outcome::Decision {
            decision,
            probability,
            threshold,
        } => {
            let label = if *decision {
                &labels.positive
            } else {
                &labels.negative
            };
            lines.push(format!("│  Prediction:   {}", label));
            lines.push(format!(
                "│  Probability:  {}",
                format_probability(*probability, output.probability_precision)
            ));
            lines.push(format!("│  Threshold:    {:.4}", threshold));
        }
    }

    format!(
        "\n┌─────────────────────────────────────────────────┐\n{}\n└─────────────────────────────────────────────────┘\n",
        lines.join("\n")
    )
}
