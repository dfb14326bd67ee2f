// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Step gating: what must be true before the wizard may leave a step.

use std::fmt;

use crate::core::error::WizardError;
use crate::draft::{ContentSchema, FieldKey, SiteDraft, Step};

/// Why the wizard refused to leave a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// No template selected at the template step.
    MissingTemplate,
    /// Required content fields are blank.
    MissingFields(Vec<FieldKey>),
}

impl ValidationFailure {
    /// Message shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            ValidationFailure::MissingTemplate => "Please select a template",
            ValidationFailure::MissingFields(_) => {
                "Please fill in all required fields"
            }
        }
    }

    /// Content fields to mark invalid.
    pub fn fields(&self) -> &[FieldKey] {
        match self {
            ValidationFailure::MissingTemplate => &[],
            ValidationFailure::MissingFields(fields) => fields,
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::MissingTemplate => f.write_str(self.message()),
            ValidationFailure::MissingFields(fields) => {
                write!(f, "{}: {}", self.message(), fields.join(", "))
            }
        }
    }
}

impl From<ValidationFailure> for WizardError {
    fn from(failure: ValidationFailure) -> Self {
        WizardError::validation(failure.message(), failure.fields().to_vec())
    }
}

/// Checks the requirements for leaving `step`.
///
/// The style and review steps never block.
pub fn validate(
    step: Step,
    draft: &SiteDraft,
    schema: &ContentSchema,
) -> Result<(), ValidationFailure> {
    match step {
        Step::Template => {
            let selected = draft
                .template
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty());
            if selected {
                Ok(())
            } else {
                Err(ValidationFailure::MissingTemplate)
            }
        }
        Step::Content => {
            let missing = schema.missing_required(draft);
            if missing.is_empty() {
                Ok(())
            } else {
                Err(ValidationFailure::MissingFields(missing))
            }
        }
        Step::Style | Step::Review => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::FieldSpec;

    fn schema() -> ContentSchema {
        ContentSchema::new(vec![
            FieldSpec::required("headline"),
            FieldSpec::optional("footer"),
        ])
    }

    #[test]
    fn test_template_step_requires_template() {
        let mut draft = SiteDraft::default();
        assert_eq!(
            validate(Step::Template, &draft, &schema()),
            Err(ValidationFailure::MissingTemplate)
        );
        draft.template = Some("modern-1".into());
        assert!(validate(Step::Template, &draft, &schema()).is_ok());
    }

    #[test]
    fn test_content_step_reports_blank_required_fields() {
        let mut draft = SiteDraft::default();
        _ = draft.content.insert("footer".into(), "(c) 2024".into());
        let failure = validate(Step::Content, &draft, &schema()).unwrap_err();
        assert_eq!(failure.fields(), &["headline".to_string()]);
        assert_eq!(
            failure.to_string(),
            "Please fill in all required fields: headline"
        );

        _ = draft.content.insert("headline".into(), "Fresh bread".into());
        assert!(validate(Step::Content, &draft, &schema()).is_ok());
    }

    #[test]
    fn test_late_steps_never_block() {
        let draft = SiteDraft::default();
        assert!(validate(Step::Style, &draft, &schema()).is_ok());
        assert!(validate(Step::Review, &draft, &schema()).is_ok());
    }

    #[test]
    fn test_failure_converts_to_wizard_error() {
        let err: WizardError =
            ValidationFailure::MissingFields(vec!["headline".into()]).into();
        match err {
            WizardError::Validation { message, fields } => {
                assert_eq!(message, "Please fill in all required fields");
                assert_eq!(fields, vec!["headline".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
