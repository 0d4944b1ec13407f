//! Loan default risk
//!
//! Fifteen columns collected over two pages: what the client declares and
//! what the lender's internal assessment adds. Two models ship for the same
//! schema. The decision tree was fit on standardized inputs and returns a
//! hard label; the forest takes raw inputs and exposes class probabilities.

use super::{ArtifactPaths, FormPage, OutcomeLabels, Profile};
use crate::features::{FeatureSchema, FieldRule, Level};
use crate::model::Task;
use crate::Result;

pub const TREE_NAME: &str = "credit-risk-tree";
pub const FOREST_NAME: &str = "credit-risk-forest";

const COLUMNS: [&str; 15] = [
    "Upfront_charges",
    "property_value",
    "income",
    "dtir1",
    "Gender_Joint",
    "Gender_Sex Not Available",
    "loan_type_type2",
    "business_or_commercial_nob/c",
    "Neg_ammortization_not_neg",
    "lump_sum_payment_not_lpsm",
    "credit_type_CRIF",
    "credit_type_EQUI",
    "credit_type_EXP",
    "co-applicant_credit_type_EXP",
    "submission_of_application_to_inst",
];

const CLIENT_FIELDS: [&str; 9] = [
    "income",
    "property_value",
    "upfront_charges",
    "dtir1",
    "gender",
    "loan_type",
    "business_or_commercial",
    "neg_ammortization",
    "lump_sum_payment",
];

const ASSESSMENT_FIELDS: [&str; 3] = [
    "credit_type",
    "co_applicant_credit_type",
    "submission_of_application",
];

fn fields() -> Vec<FieldRule> {
    vec![
        FieldRule::numeric_in("upfront_charges", Some(0.0), None).with_column("Upfront_charges"),
        FieldRule::numeric_in("property_value", Some(0.0), None),
        FieldRule::numeric_in("income", Some(0.0), None),
        FieldRule::numeric_in("dtir1", Some(0.0), Some(1.0)),
        FieldRule::one_hot(
            "gender",
            vec![
                Level::new("Individual").reference(),
                Level::new("Joint").column("Gender_Joint"),
                Level::new("Sex Not Available").column("Gender_Sex Not Available"),
            ],
        ),
        FieldRule::one_hot(
            "loan_type",
            vec![
                Level::new("type1").reference().alias("Conventional"),
                Level::new("type2").alias("Type 2"),
            ],
        ),
        FieldRule::one_hot(
            "business_or_commercial",
            vec![
                Level::new("b/c").reference().alias("Business"),
                Level::new("nob/c").alias("No Business/Commercial"),
            ],
        ),
        FieldRule::one_hot(
            "neg_ammortization",
            vec![
                Level::new("neg_amm").reference().alias("Yes"),
                Level::new("not_neg")
                    .column("Neg_ammortization_not_neg")
                    .alias("No"),
            ],
        ),
        FieldRule::one_hot(
            "lump_sum_payment",
            vec![
                Level::new("lpsm").reference().alias("Yes"),
                Level::new("not_lpsm").alias("No"),
            ],
        ),
        FieldRule::multi_hot("credit_type", &["CRIF", "EQUI", "EXP"]),
        FieldRule::one_hot(
            "co_applicant_credit_type",
            vec![
                Level::new("CIB").reference().alias("None"),
                Level::new("EXP").column("co-applicant_credit_type_EXP"),
            ],
        ),
        FieldRule::one_hot(
            "submission_of_application",
            vec![
                Level::new("not_inst").reference().alias("No"),
                Level::new("to_inst").alias("Yes"),
            ],
        ),
    ]
}

fn pages() -> Vec<FormPage> {
    let page = |title: &str, fields: &[&str]| FormPage {
        title: title.to_string(),
        fields: fields.iter().map(|f| f.to_string()).collect(),
    };
    vec![
        page("Client Info", &CLIENT_FIELDS),
        page("Internal Assessment", &ASSESSMENT_FIELDS),
    ]
}

fn base(name: &str, title: &str, artifacts: ArtifactPaths) -> Result<Profile> {
    Ok(Profile {
        name: name.to_string(),
        title: title.to_string(),
        task: Task::Classification,
        schema: FeatureSchema::from_names(&COLUMNS)?,
        artifacts,
        labels: Some(OutcomeLabels {
            negative: "Not likely to default".to_string(),
            positive: "Likely to default".to_string(),
        }),
        pages: pages(),
        fields: fields(),
    })
}

/// Decision tree over standardized inputs
pub fn tree_profile() -> Result<Profile> {
    base(
        TREE_NAME,
        "Loan Default Prediction (decision tree)",
        ArtifactPaths {
            model: "model.json".into(),
            scaler: Some("scaler.json".into()),
            threshold: None,
        },
    )
}

/// Random forest over raw inputs
pub fn forest_profile() -> Result<Profile> {
    base(
        FOREST_NAME,
        "Loan Default Prediction (random forest)",
        ArtifactPaths {
            model: "model.json".into(),
            scaler: None,
            threshold: None,
        },
    )
}
