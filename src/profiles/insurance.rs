//! Medical insurance cost estimator
//!
//! Linear regression over age, BMI, dependants and three categorical fields
//! encoded with the first category dropped.

use super::{ArtifactPaths, FormPage, Profile};
use crate::features::{FeatureSchema, FieldRule};
use crate::model::Task;
use crate::Result;

pub const NAME: &str = "insurance-cost";

const COLUMNS: [&str; 8] = [
    "age",
    "bmi",
    "children",
    "sex_male",
    "smoker_yes",
    "region_northwest",
    "region_southeast",
    "region_southwest",
];

pub fn profile() -> Result<Profile> {
    let fields = vec![
        FieldRule::numeric_in("age", Some(18.0), Some(100.0)),
        FieldRule::numeric_in("bmi", Some(10.0), Some(60.0)),
        FieldRule::numeric_in("children", Some(0.0), Some(10.0)),
        FieldRule::one_hot_drop_first("sex", &["female", "male"]),
        FieldRule::one_hot_drop_first("smoker", &["no", "yes"]),
        FieldRule::one_hot_drop_first(
            "region",
            &["northeast", "northwest", "southeast", "southwest"],
        ),
    ];

    Ok(Profile {
        name: NAME.to_string(),
        title: "Medical Insurance Cost Predictor".to_string(),
        task: Task::Regression,
        schema: FeatureSchema::from_names(&COLUMNS)?,
        artifacts: ArtifactPaths {
            model: "model.json".into(),
            scaler: None,
            threshold: None,
        },
        labels: None,
        pages: vec![FormPage {
            title: "Policy Holder".to_string(),
            fields: ["age", "bmi", "children", "sex", "smoker", "region"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }],
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearModel;
    use crate::predict::format::format_currency;
    use crate::predict::{Outcome, PredictionService};
    use crate::{raw_input, FieldValue, FormcastError, RawInput};

    fn applicant() -> RawInput {
        raw_input([
            ("age", FieldValue::from(30)),
            ("bmi", FieldValue::from(25.0)),
            ("children", FieldValue::from(1)),
            ("sex", "male".into()),
            ("smoker", "no".into()),
            ("region", "northwest".into()),
        ])
    }

    #[test]
    fn test_encodes_applicant() {
        let encoder = profile().unwrap().encoder().unwrap();
        let v = encoder.encode(&applicant()).unwrap();
        assert_eq!(v.values(), [30.0, 25.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_reference_categories_encode_to_zero() {
        let encoder = profile().unwrap().encoder().unwrap();
        let mut input = applicant();
        input.insert("sex".to_string(), "female".into());
        input.insert("region".to_string(), "northeast".into());
        let v = encoder.encode(&input).unwrap();
        assert_eq!(&v.values()[3..], [0.0; 5]);
    }

    #[test]
    fn test_age_below_form_minimum() {
        let encoder = profile().unwrap().encoder().unwrap();
        let mut input = applicant();
        input.insert("age".to_string(), FieldValue::from(12));
        assert!(matches!(
            encoder.encode(&input),
            Err(FormcastError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_estimate_end_to_end() {
        let model = LinearModel::new(
            vec![256.9, 339.2, 475.5, -131.3, 23_848.5, -353.0, -1_035.0, -960.0],
            -11_938.5,
        );
        let service = PredictionService::new(profile().unwrap(), Box::new(model), None, None).unwrap();
        let Outcome::Value { value } = service.predict(&applicant()).unwrap() else {
            panic!("expected a regression value");
        };
        // -11938.5 + 7707 + 8480 + 475.5 - 131.3 - 353
        assert!((value - 4_239.7).abs() < 1e-6);
        assert_eq!(format_currency(value, "$"), "$4,239.70");
    }
}
