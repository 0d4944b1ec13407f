//! Personal loan acceptance
//!
//! Gradient-boosted classifier scored against an operating threshold chosen
//! at training time. Numeric inputs are standardized; every category keeps
//! its own column. The form shows readable labels for job, education and
//! previous-contact timing, which resolve to the training codes.

use super::{ArtifactPaths, FormPage, OutcomeLabels, Profile};
use crate::features::{BucketRule, FeatureSchema, FieldRule};
use crate::model::Task;
use crate::Result;

pub const NAME: &str = "loan-acceptance";

const NUMERIC: [(&str, f64, f64); 5] = [
    ("age", 18.0, 100.0),
    ("balance", -10_000.0, 100_000.0),
    ("day", 1.0, 31.0),
    ("campaign", 1.0, 50.0),
    ("previous", 0.0, 50.0),
];

const JOBS: [(&str, &str); 12] = [
    ("admin.", "Admin"),
    ("blue-collar", "Blue-Collar (manual worker)"),
    ("entrepreneur", "Entrepreneur"),
    ("housemaid", "Housemaid"),
    ("management", "Management"),
    ("retired", "Retired"),
    ("self-employed", "Self-Employed"),
    ("services", "Services"),
    ("student", "Student"),
    ("technician", "Technician"),
    ("unemployed", "Unemployed"),
    ("unknown", "Not Specified"),
];

const EDUCATION: [(&str, &str); 4] = [
    ("primary", "Primary School"),
    ("secondary", "High School"),
    ("tertiary", "University or Higher Education"),
    ("unknown", "Not Specified"),
];

const MONTHS: [&str; 12] = [
    "apr", "aug", "dec", "feb", "jan", "jul", "jun", "mar", "may", "nov", "oct", "sep",
];

const CONTACT_TIMING: [(&str, &str); 3] = [
    ("never", "Never Contacted Before"),
    ("old", "Contacted Long Ago"),
    ("recent", "Recently Contacted"),
];

const PDAYS_PREFIX: &str = "pdays_category";

fn with_aliases(mut rule: FieldRule, aliases: &[(&str, &str)]) -> FieldRule {
    for (code, alias) in aliases {
        rule = rule.with_alias(code, alias);
    }
    rule
}

fn codes<'a>(pairs: &'a [(&'a str, &'a str)]) -> Vec<&'a str> {
    pairs.iter().map(|(code, _)| *code).collect()
}

fn fields() -> Vec<FieldRule> {
    let mut fields: Vec<FieldRule> = NUMERIC
        .iter()
        .map(|(field, min, max)| FieldRule::numeric_in(field, Some(*min), Some(*max)))
        .collect();

    fields.extend([
        with_aliases(FieldRule::one_hot_all("job", &codes(&JOBS)), &JOBS),
        FieldRule::one_hot_all("marital", &["divorced", "married", "single"]),
        with_aliases(
            FieldRule::one_hot_all("education", &codes(&EDUCATION)),
            &EDUCATION,
        ),
        FieldRule::one_hot_all("default", &["no", "yes"]),
        FieldRule::one_hot_all("housing", &["no", "yes"]),
        FieldRule::one_hot_all("loan", &["no", "yes"]),
        FieldRule::one_hot_all("contact", &["cellular", "telephone"]),
        FieldRule::one_hot_all("month", &MONTHS),
        FieldRule::one_hot_all("poutcome", &["failure", "other", "success", "unknown"]),
        with_aliases(
            FieldRule::bucket("pdays", BucketRule::recency_sentinel_999(), PDAYS_PREFIX),
            &CONTACT_TIMING,
        ),
    ]);
    fields
}

/// Numeric columns first, then each categorical field's levels in sorted order
fn columns() -> Vec<String> {
    let mut columns: Vec<String> = NUMERIC.iter().map(|(f, _, _)| f.to_string()).collect();
    let categorical: [(&str, Vec<&str>); 10] = [
        ("job", codes(&JOBS)),
        ("marital", vec!["divorced", "married", "single"]),
        ("education", codes(&EDUCATION)),
        ("default", vec!["no", "yes"]),
        ("housing", vec!["no", "yes"]),
        ("loan", vec!["no", "yes"]),
        ("contact", vec!["cellular", "telephone"]),
        ("month", MONTHS.to_vec()),
        ("poutcome", vec!["failure", "other", "success", "unknown"]),
        (PDAYS_PREFIX, codes(&CONTACT_TIMING)),
    ];
    for (field, levels) in categorical {
        columns.extend(levels.iter().map(|level| format!("{}_{}", field, level)));
    }
    columns
}

pub fn profile() -> Result<Profile> {
    let numeric = NUMERIC.iter().map(|(f, _, _)| f.to_string()).collect();
    Ok(Profile {
        name: NAME.to_string(),
        title: "Personal Loan Acceptance Prediction".to_string(),
        task: Task::Classification,
        schema: FeatureSchema::new(columns())?,
        artifacts: ArtifactPaths {
            model: "model.json".into(),
            scaler: Some("scaler.json".into()),
            threshold: Some("threshold.json".into()),
        },
        labels: Some(OutcomeLabels {
            negative: "Will Not Accept".to_string(),
            positive: "Will Accept".to_string(),
        }),
        pages: vec![
            FormPage {
                title: "Client".to_string(),
                fields: numeric,
            },
            FormPage {
                title: "Background".to_string(),
                fields: [
                    "job",
                    "marital",
                    "education",
                    "default",
                    "housing",
                    "loan",
                    "contact",
                    "month",
                    "poutcome",
                    "pdays",
                ]
                .iter()
                .map(|f| f.to_string())
                .collect(),
            },
        ],
        fields: fields(),
    })
}
