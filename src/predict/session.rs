//! Multi-page form input
//!
//! Some forms collect their fields across several pages. A session merges the
//! pages in submission order and refuses to hand the input to the encoder
//! until every field the encoder references has been filled in.

use crate::features::FeatureEncoder;
use crate::{FormcastError, RawInput, Result};

#[derive(Debug, Clone)]
pub struct FormSession<'a> {
    encoder: &'a FeatureEncoder,
    values: RawInput,
    pages: usize,
}

impl<'a> FormSession<'a> {
    pub fn new(encoder: &'a FeatureEncoder) -> Self {
        FormSession {
            encoder,
            values: RawInput::new(),
            pages: 0,
        }
    }

    /// Merge one page; values on later pages replace earlier ones
    pub fn submit(&mut self, page: RawInput) {
        self.pages += 1;
        log::debug!("Form page {} supplied {} fields", self.pages, page.len());
        self.values.extend(page);
    }

    /// Referenced fields not supplied yet, in rule order
    pub fn missing_fields(&self) -> Vec<&str> {
        self.encoder
            .fields()
            .filter(|f| !self.values.contains_key(*f))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn values(&self) -> &RawInput {
        &self.values
    }

    /// The merged input, once every page is complete
    pub fn finish(self) -> Result<RawInput> {
        if let Some(field) = self.missing_fields().first() {
            return Err(FormcastError::MissingField(field.to_string()));
        }
        Ok(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureSchema, FieldRule};
    use crate::{raw_input, FieldValue};

    fn encoder() -> FeatureEncoder {
        FeatureEncoder::new(
            vec![
                FieldRule::numeric("income"),
                FieldRule::numeric("loan_amount"),
                FieldRule::multi_hot("credit_type", &["CIB", "CRIF", "EQUI", "EXP"]),
            ],
            FeatureSchema::from_names(&[
                "income",
                "loan_amount",
                "credit_type_CIB",
                "credit_type_CRIF",
                "credit_type_EQUI",
                "credit_type_EXP",
            ])
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_pages_merge() {
        let encoder = encoder();
        let mut session = FormSession::new(&encoder);
        assert_eq!(session.missing_fields(), vec!["income", "loan_amount", "credit_type"]);

        session.submit(raw_input([("income", 5000.0), ("loan_amount", 1000.0)]));
        assert!(!session.is_complete());
        assert_eq!(session.missing_fields(), vec!["credit_type"]);

        session.submit(raw_input([("credit_type", FieldValue::set(["EXP"]))]));
        assert!(session.is_complete());
        assert_eq!(session.pages(), 2);

        let input = session.finish().unwrap();
        let v = encoder.encode(&input).unwrap();
        assert_eq!(v.values(), [5000.0, 1000.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_later_pages_override() {
        let encoder = encoder();
        let mut session = FormSession::new(&encoder);
        session.submit(raw_input([("income", 5000.0)]));
        session.submit(raw_input([("income", 6000.0)]));
        assert_eq!(session.values()["income"], FieldValue::Number(6000.0));
    }

    #[test]
    fn test_finish_incomplete() {
        let encoder = encoder();
        let mut session = FormSession::new(&encoder);
        session.submit(raw_input([("income", 5000.0)]));
        let err = session.finish().unwrap_err();
        assert!(matches!(err, FormcastError::MissingField(f) if f == "loan_amount"));
    }

    #[test]
    fn test_empty_selection_counts_as_answered() {
        let encoder = encoder();
        let mut session = FormSession::new(&encoder);
        session.submit(raw_input([
            ("income", FieldValue::from(1.0)),
            ("loan_amount", FieldValue::from(2.0)),
            ("credit_type", FieldValue::Set(Vec::new())),
        ]));
        assert!(session.finish().is_ok());
    }
}
