//! Wizard forms.
//!
//! Step one is a static form. Step two is composed per request from the
//! entry's [`EntryForm`] and the [`Step2BaseForm`] mixin by
//! [`step2_form_factory`]. When no entry is known yet, step two falls back
//! to [`FormClass::Placeholder`], which has no fields and saves nothing.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::models::{CurrentUser, Page};
use crate::services::Transaction;

use super::error::WizardError;
use super::files::{StagedFile, StagedFiles};
use super::registry::EntryRegistry;
use super::step::Step;

/// Raw submitted values keyed by their step-prefixed name (`0-entry`).
pub type RawData = HashMap<String, String>;
/// Validated values keyed by their bare field name (`entry`).
pub type CleanedData = BTreeMap<String, String>;

/// Key under which errors not tied to a single field are collected.
pub const NON_FIELD_ERRORS: &str = "__all__";

#[derive(Clone, Debug, PartialEq)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Text { max_length: Option<usize> },
    TextArea,
    Select { choices: Vec<Choice> },
    Hidden,
    File,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub help_text: String,
}

impl FieldSpec {
    fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: true,
            help_text: String::new(),
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Text { max_length: None })
    }

    pub fn textarea(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::TextArea)
    }

    pub fn select(name: &str, label: &str, choices: Vec<Choice>) -> Self {
        Self::new(name, label, FieldKind::Select { choices })
    }

    pub fn hidden(name: &str) -> Self {
        Self::new(name, "", FieldKind::Hidden)
    }

    pub fn file(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::File)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let FieldKind::Text { max_length } = &mut self.kind {
            *max_length = Some(max);
        }
        self
    }

    pub fn help(mut self, text: &str) -> Self {
        self.help_text = text.to_string();
        self
    }

    /// Widget name used by the templates.
    pub fn widget(&self) -> &'static str {
        match self.kind {
            FieldKind::Text { .. } => "text",
            FieldKind::TextArea => "textarea",
            FieldKind::Select { .. } => "select",
            FieldKind::Hidden => "hidden",
            FieldKind::File => "file",
        }
    }

    fn clean(&self, raw: Option<&str>, staged: Option<&StagedFile>) -> Result<Option<String>, String> {
        if let FieldKind::File = self.kind {
            return match staged {
                Some(file) => Ok(Some(file.path.display().to_string())),
                None if self.required => Err(REQUIRED.to_string()),
                None => Ok(None),
            };
        }
        let value = raw.map(str::trim).unwrap_or("");
        if value.is_empty() {
            return if self.required {
                Err(REQUIRED.to_string())
            } else {
                Ok(None)
            };
        }
        match &self.kind {
            FieldKind::Text { max_length: Some(max) } => {
                let len = value.chars().count();
                if len > *max {
                    return Err(format!(
                        "Ensure this value has at most {} characters (it has {}).",
                        max, len
                    ));
                }
            }
            FieldKind::Select { choices } => {
                if !choices.iter().any(|c| c.value == value) {
                    return Err(format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        value
                    ));
                }
            }
            _ => {}
        }
        Ok(Some(value.to_string()))
    }
}

const REQUIRED: &str = "This field is required.";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field_errors(&self) -> &[String] {
        self.get(NON_FIELD_ERRORS)
    }
}

/// Construction arguments every wizard form receives.
#[derive(Clone, Debug, PartialEq)]
pub struct FormKwargs {
    pub user: CurrentUser,
    pub language: String,
    /// Container the new entry will be attached to, if any.
    pub page: Option<Page>,
}

/// The entry-specific half of a step-two form.
pub trait EntryForm: Send + Sync {
    /// Fields contributed by the entry, without step prefix.
    fn fields(&self, kwargs: &FormKwargs) -> Vec<FieldSpec>;

    /// Cross-field validation, run after every field has been cleaned.
    fn clean(&self, _cleaned: &mut CleanedData, _kwargs: &FormKwargs, _errors: &mut FormErrors) {}

    /// Create the new object inside `tx`.
    fn save(&self, cleaned: &CleanedData, kwargs: &FormKwargs, tx: &mut Transaction) -> Result<Page, WizardError>;
}

/// Behaviour shared by every step-two form: carries the container page and
/// ties the submission to the wizard's context.
#[derive(Clone, Copy, Debug, Default)]
pub struct Step2BaseForm;

impl Step2BaseForm {
    pub fn fields(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::hidden("page").optional()]
    }

    pub fn clean(&self, cleaned: &mut CleanedData, kwargs: &FormKwargs, errors: &mut FormErrors) {
        if !kwargs.user.can_add_content() {
            errors.add_non_field("You do not have permission to create content.");
        }
        let expected = kwargs.page.as_ref().map(|p| p.id.to_string());
        if let Some(submitted) = cleaned.get("page") {
            if expected.as_deref() != Some(submitted.as_str()) {
                errors.add("page", "The page does not match the page chosen in the first step.");
            }
        }
        match expected {
            Some(id) => {
                cleaned.insert("page".into(), id);
            }
            None => {
                cleaned.remove("page");
            }
        }
    }
}

/// An entry form composed with the step-two mixin.
#[derive(Clone)]
pub struct Step2FormClass {
    mixin: Step2BaseForm,
    entry: Arc<dyn EntryForm>,
}

impl fmt::Debug for Step2FormClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step2FormClass").field("mixin", &self.mixin).finish_non_exhaustive()
    }
}

impl Step2FormClass {
    fn fields(&self, kwargs: &FormKwargs) -> Vec<FieldSpec> {
        let mut fields = self.mixin.fields();
        fields.extend(self.entry.fields(kwargs));
        fields
    }
}

/// Compose `entry_form` with `mixin` into the form used for step two.
pub fn step2_form_factory(mixin: Step2BaseForm, entry_form: Arc<dyn EntryForm>) -> Step2FormClass {
    Step2FormClass {
        mixin,
        entry: entry_form,
    }
}

/// Entry selection: which entry to create and, optionally, under which page.
#[derive(Clone, Debug, PartialEq)]
pub struct Step1Form {
    choices: Vec<Choice>,
}

impl Step1Form {
    /// Offer every registered entry the acting user may add at the context page.
    pub fn new(registry: &EntryRegistry, kwargs: &FormKwargs) -> Self {
        let choices = registry
            .entries()
            .iter()
            .filter(|e| e.user_has_add_permission(&kwargs.user, kwargs.page.as_ref()))
            .map(|e| Choice {
                value: e.id().to_string(),
                label: e.title().to_string(),
                description: e.description().to_string(),
            })
            .collect();
        Self { choices }
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::select("entry", "What would you like to create?", self.choices.clone()),
            FieldSpec::hidden("page").optional(),
        ]
    }

    /// Unknown or malformed container keys mean "no container".
    fn clean(&self, cleaned: &mut CleanedData, kwargs: &FormKwargs, _errors: &mut FormErrors) {
        match &kwargs.page {
            Some(page) => {
                cleaned.insert("page".into(), page.id.to_string());
            }
            None => {
                if let Some(pk) = cleaned.remove("page") {
                    tracing::debug!(pk = %pk, "Container page not found; continuing without one");
                }
            }
        }
    }
}

/// The form type bound for a step.
#[derive(Clone, Debug)]
pub enum FormClass {
    StepOne(Step1Form),
    StepTwo(Step2FormClass),
    /// Stand-in for step two before an entry is known. Accepts nothing.
    Placeholder,
}

impl FormClass {
    fn fields(&self, kwargs: &FormKwargs) -> Vec<FieldSpec> {
        match self {
            FormClass::StepOne(form) => form.fields(),
            FormClass::StepTwo(class) => class.fields(kwargs),
            FormClass::Placeholder => Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, FormClass::Placeholder)
    }
}

#[derive(Clone, Debug)]
pub struct ChoiceView {
    pub value: String,
    pub label: String,
    pub description: String,
    pub selected: bool,
}

/// A field prepared for the templates.
#[derive(Clone, Debug)]
pub struct FieldView {
    pub html_name: String,
    pub label: String,
    pub widget: &'static str,
    pub value: String,
    pub required: bool,
    pub help_text: String,
    pub choices: Vec<ChoiceView>,
    pub errors: Vec<String>,
}

/// A form instance for one step, bound to submitted data or unbound.
#[derive(Clone, Debug)]
pub struct StepForm {
    step: Step,
    class: FormClass,
    kwargs: FormKwargs,
    fields: Vec<FieldSpec>,
    data: Option<RawData>,
    files: StagedFiles,
    initial: RawData,
    outcome: Option<Result<CleanedData, FormErrors>>,
}

impl StepForm {
    pub fn new(
        step: Step,
        class: FormClass,
        kwargs: FormKwargs,
        data: Option<RawData>,
        files: StagedFiles,
        initial: RawData,
    ) -> Self {
        let fields = class.fields(&kwargs);
        Self {
            step,
            class,
            kwargs,
            fields,
            data,
            files,
            initial,
            outcome: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn class(&self) -> &FormClass {
        &self.class
    }

    pub fn kwargs(&self) -> &FormKwargs {
        &self.kwargs
    }

    pub fn initial(&self) -> &RawData {
        &self.initial
    }

    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn required_fields(&self) -> Vec<&FieldSpec> {
        self.fields.iter().filter(|f| f.required).collect()
    }

    pub fn optional_fields(&self) -> Vec<&FieldSpec> {
        self.fields.iter().filter(|f| !f.required).collect()
    }

    pub fn is_valid(&mut self) -> bool {
        self.full_clean();
        matches!(self.outcome, Some(Ok(_)))
    }

    /// Validation errors; empty for unbound or valid forms.
    pub fn errors(&mut self) -> FormErrors {
        self.full_clean();
        match &self.outcome {
            Some(Err(errors)) => errors.clone(),
            _ => FormErrors::default(),
        }
    }

    /// Cleaned values, once [`StepForm::is_valid`] returned true.
    pub fn cleaned_data(&self) -> Option<&CleanedData> {
        match &self.outcome {
            Some(Ok(cleaned)) => Some(cleaned),
            _ => None,
        }
    }

    fn full_clean(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let Some(data) = &self.data else {
            return;
        };
        let mut cleaned = CleanedData::new();
        let mut errors = FormErrors::default();
        for field in &self.fields {
            let key = self.step.field_key(&field.name);
            match field.clean(data.get(&key).map(String::as_str), self.files.get(&key)) {
                Ok(Some(value)) => {
                    cleaned.insert(field.name.clone(), value);
                }
                Ok(None) => {}
                Err(message) => errors.add(&field.name, message),
            }
        }
        match &self.class {
            FormClass::StepOne(form) => form.clean(&mut cleaned, &self.kwargs, &mut errors),
            FormClass::StepTwo(class) => {
                class.mixin.clean(&mut cleaned, &self.kwargs, &mut errors);
                class.entry.clean(&mut cleaned, &self.kwargs, &mut errors);
            }
            FormClass::Placeholder => {}
        }
        self.outcome = Some(if errors.is_empty() { Ok(cleaned) } else { Err(errors) });
    }

    /// Create the entry's object. Only a validated step-two form can save.
    pub fn save(&self, tx: &mut Transaction) -> Result<Page, WizardError> {
        let cleaned = self.cleaned_data().ok_or(WizardError::InvalidForm(self.step))?;
        match &self.class {
            FormClass::StepTwo(class) => class.entry.save(cleaned, &self.kwargs, tx),
            FormClass::StepOne(_) => Err(WizardError::InvalidForm(self.step)),
            FormClass::Placeholder => Err(WizardError::StepOneIncomplete),
        }
    }

    pub fn non_field_errors(&mut self) -> Vec<String> {
        self.errors().non_field_errors().to_vec()
    }

    pub fn field_views(&mut self) -> Vec<FieldView> {
        let errors = self.errors();
        self.fields
            .iter()
            .map(|field| {
                let key = self.step.field_key(&field.name);
                let value = match &self.data {
                    Some(data) => data.get(&key).cloned().unwrap_or_default(),
                    None => self.initial.get(&field.name).cloned().unwrap_or_default(),
                };
                let choices = match &field.kind {
                    FieldKind::Select { choices } => choices
                        .iter()
                        .map(|c| ChoiceView {
                            value: c.value.clone(),
                            label: c.label.clone(),
                            description: c.description.clone(),
                            selected: c.value == value,
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                FieldView {
                    html_name: key,
                    label: field.label.clone(),
                    widget: field.widget(),
                    value,
                    required: field.required,
                    help_text: field.help_text.clone(),
                    choices,
                    errors: errors.get(&field.name).to_vec(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    struct TitleOnly;

    impl EntryForm for TitleOnly {
        fn fields(&self, _kwargs: &FormKwargs) -> Vec<FieldSpec> {
            vec![FieldSpec::text("title", "Title").max_length(5)]
        }

        fn save(&self, _cleaned: &CleanedData, _kwargs: &FormKwargs, _tx: &mut Transaction) -> Result<Page, WizardError> {
            Err(WizardError::StepOneIncomplete)
        }
    }

    fn kwargs(page: Option<Page>) -> FormKwargs {
        FormKwargs {
            user: CurrentUser::new("ed", UserRole::Editor),
            language: "en".into(),
            page,
        }
    }

    fn container(id: u64) -> Page {
        Page {
            id,
            title: "Home".into(),
            slug: "home".into(),
            path: "home".into(),
            parent_id: None,
            language: "en".into(),
            content: String::new(),
            created_by: String::new(),
            created_at: String::new(),
        }
    }

    fn data(pairs: &[(&str, &str)]) -> Option<RawData> {
        Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn step_two(page: Option<Page>, submitted: Option<RawData>) -> StepForm {
        let class = step2_form_factory(Step2BaseForm, Arc::new(TitleOnly));
        StepForm::new(Step::Two, FormClass::StepTwo(class), kwargs(page), submitted, StagedFiles::new(), RawData::new())
    }

    #[test]
    fn composed_form_has_mixin_and_entry_fields() {
        let form = step_two(None, None);
        let names: Vec<_> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["page", "title"]);
        assert_eq!(form.required_fields().len(), 1);
        assert_eq!(form.optional_fields()[0].name, "page");
    }

    #[test]
    fn unbound_form_is_invalid_without_errors() {
        let mut form = step_two(None, None);
        assert!(!form.is_valid());
        assert!(form.errors().is_empty());
    }

    #[test]
    fn max_length_is_enforced() {
        let mut form = step_two(None, data(&[("1-title", "far too long")]));
        assert!(!form.is_valid());
        assert!(form.errors().has("title"));
    }

    #[test]
    fn mixin_pins_page_to_context() {
        let mut form = step_two(Some(container(4)), data(&[("1-title", "Hi"), ("1-page", "5")]));
        assert!(!form.is_valid());
        assert!(form.errors().has("page"));

        let mut form = step_two(Some(container(4)), data(&[("1-title", "Hi")]));
        assert!(form.is_valid());
        assert_eq!(form.cleaned_data().unwrap().get("page").map(String::as_str), Some("4"));
    }

    #[test]
    fn mixin_rejects_viewers() {
        let class = step2_form_factory(Step2BaseForm, Arc::new(TitleOnly));
        let mut kw = kwargs(None);
        kw.user = CurrentUser::anonymous();
        let mut form = StepForm::new(Step::Two, FormClass::StepTwo(class), kw, data(&[("1-title", "Hi")]), StagedFiles::new(), RawData::new());
        assert!(!form.is_valid());
        assert_eq!(form.non_field_errors().len(), 1);
    }

    #[test]
    fn placeholder_accepts_nothing() {
        let mut form = StepForm::new(
            Step::Two,
            FormClass::Placeholder,
            kwargs(None),
            data(&[("1-title", "ignored")]),
            StagedFiles::new(),
            RawData::new(),
        );
        assert!(form.fields().is_empty());
        assert!(form.is_valid());
        assert!(form.cleaned_data().unwrap().is_empty());
    }

    #[test]
    fn unbound_views_use_initial_values() {
        let mut initial = RawData::new();
        initial.insert("page".into(), "42".into());
        let mut form = StepForm::new(
            Step::One,
            FormClass::StepOne(Step1Form { choices: Vec::new() }),
            kwargs(None),
            None,
            StagedFiles::new(),
            initial,
        );
        let views = form.field_views();
        let page = views.iter().find(|v| v.html_name == "0-page").unwrap();
        assert_eq!(page.value, "42");
        assert_eq!(page.widget, "hidden");
    }

    #[test]
    fn unknown_container_is_dropped_from_step_one() {
        let choices = vec![Choice {
            value: "page".into(),
            label: "Page".into(),
            description: String::new(),
        }];
        let mut form = StepForm::new(
            Step::One,
            FormClass::StepOne(Step1Form { choices }),
            kwargs(None),
            data(&[("0-entry", "page"), ("0-page", "not-a-pk")]),
            StagedFiles::new(),
            RawData::new(),
        );
        assert!(form.is_valid());
        assert!(form.cleaned_data().unwrap().get("page").is_none());
    }
}
