//! The two-step creation wizard.
//!
//! Step one picks an entry (and optionally a container page); step two shows
//! that entry's form. The step-two form is never registered statically: it
//! is composed from step one's cleaned data on every resolution, which is
//! only possible through a [`StepOneComplete`] value.

use std::sync::Arc;

use crate::models::{CurrentUser, Page};
use crate::services::ContentStore;

use super::error::WizardError;
use super::files::{FileStaging, StagedFiles, UploadedFile};
use super::forms::{
    step2_form_factory, CleanedData, FormClass, FormKwargs, RawData, Step1Form, Step2BaseForm, StepForm,
};
use super::registry::{EntryDescriptor, EntryRegistry};
use super::step::Step;
use super::storage::WizardSession;

pub const START_TEMPLATE: &str = "wizard/start.html";
pub const DONE_TEMPLATE: &str = "wizard/done.html";

/// Hidden field echoing the step a submission belongs to.
pub const MANAGEMENT_FIELD: &str = "wizard_create_view-current_step";
/// Submit-button name used to jump back to an earlier step.
pub const GOTO_STEP_FIELD: &str = "wizard_goto_step";
/// Query parameter naming the container page.
pub const PAGE_HINT_PARAM: &str = "page";

/// Facts about the current request, fixed when it is dispatched.
#[derive(Clone, Debug)]
pub struct WizardRequest {
    user: CurrentUser,
    language: String,
    page_hint: Option<String>,
}

impl WizardRequest {
    pub fn new(user: CurrentUser, language: impl Into<String>, page_hint: Option<String>) -> Self {
        Self {
            user,
            language: language.into(),
            page_hint,
        }
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn page_hint(&self) -> Option<&str> {
        self.page_hint.as_deref()
    }
}

/// Shared collaborators the controller reads from.
#[derive(Clone, Copy)]
pub struct WizardContext<'a> {
    pub registry: &'a EntryRegistry,
    pub store: &'a ContentStore,
    pub files: &'a FileStaging,
}

/// How far the wizard has validly progressed.
#[derive(Clone, Debug)]
pub enum WizardPhase {
    Unvalidated,
    StepOneComplete(StepOneComplete),
}

/// Step one validated: the entry and its container are known.
#[derive(Clone, Debug)]
pub struct StepOneComplete {
    entry: Arc<EntryDescriptor>,
    container: Option<Page>,
}

impl StepOneComplete {
    pub fn entry(&self) -> &Arc<EntryDescriptor> {
        &self.entry
    }

    pub fn container(&self) -> Option<&Page> {
        self.container.as_ref()
    }

    /// The selected entry's form composed with `mixin`.
    pub fn step_two_form_class(&self, mixin: Step2BaseForm) -> FormClass {
        FormClass::StepTwo(step2_form_factory(mixin, self.entry.form()))
    }

    pub fn finish(self, object: Page, url: String) -> Completed {
        Completed {
            entry: self.entry,
            object,
            url,
        }
    }
}

/// The wizard finished: the object exists and the client should go to `url`.
#[derive(Clone, Debug)]
pub struct Completed {
    pub entry: Arc<EntryDescriptor>,
    pub object: Page,
    pub url: String,
}

/// A step to render.
#[derive(Debug)]
pub struct StepView {
    pub step: Step,
    pub template_name: String,
    pub form: StepForm,
    /// The selected entry, once past step one.
    pub entry: Option<Arc<EntryDescriptor>>,
}

#[derive(Debug)]
pub enum WizardResponse {
    Render(StepView),
    Done(Completed),
}

pub struct WizardController<'a> {
    ctx: WizardContext<'a>,
    request: WizardRequest,
    session: WizardSession,
    /// Container key read from the data of the form being resolved.
    page_pk: Option<String>,
}

impl<'a> WizardController<'a> {
    pub fn new(ctx: WizardContext<'a>, request: WizardRequest, mut session: WizardSession) -> Self {
        session.language = Some(request.language.clone());
        Self {
            ctx,
            request,
            session,
            page_pk: None,
        }
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn into_session(self) -> WizardSession {
        self.session
    }

    pub fn language(&self) -> &str {
        &self.request.language
    }

    pub fn page_pk(&self) -> Option<&str> {
        self.page_pk.as_deref()
    }

    /// The current step, or `None` before the wizard has started.
    pub fn get_current_step(&self) -> Option<Step> {
        self.session.current_step
    }

    fn steps_current(&self) -> Step {
        self.session.current_step.unwrap_or_else(Step::first)
    }

    pub fn is_first_step(&self, step: Option<Step>) -> bool {
        step.or_else(|| self.get_current_step()) == Some(Step::One)
    }

    pub fn is_second_step(&self, step: Option<Step>) -> bool {
        step.or_else(|| self.get_current_step()) == Some(Step::Two)
    }

    /// Revalidate the stored submission of `step`.
    pub fn get_cleaned_data_for_step(&self, step: Step) -> Option<CleanedData> {
        let data = self.session.data_for_step(step)?.clone();
        let files = self.session.files_for_step(step);
        let page_pk = data.get(&step.field_key("page")).cloned();
        let mut form = self.bind_form(step, Some(data), files, page_pk.as_deref()).ok()?;
        if form.is_valid() {
            form.cleaned_data().cloned()
        } else {
            None
        }
    }

    pub fn phase(&self) -> Result<WizardPhase, WizardError> {
        let Some(data) = self.get_cleaned_data_for_step(Step::One) else {
            return Ok(WizardPhase::Unvalidated);
        };
        let id = data.get("entry").ok_or(WizardError::StepOneIncomplete)?;
        let entry = self.ctx.registry.get_entry(id)?;
        let container = self.ctx.store.find_page(data.get("page").map(String::as_str));
        Ok(WizardPhase::StepOneComplete(StepOneComplete { entry, container }))
    }

    pub fn step_one_complete(&self) -> Result<StepOneComplete, WizardError> {
        match self.phase()? {
            WizardPhase::StepOneComplete(done) => Ok(done),
            WizardPhase::Unvalidated => Err(WizardError::StepOneIncomplete),
        }
    }

    /// The entry picked in step one, looked up afresh on every call.
    pub fn get_selected_entry(&self) -> Result<Arc<EntryDescriptor>, WizardError> {
        Ok(self.step_one_complete()?.entry)
    }

    /// The container picked in step one.
    pub fn get_origin_page(&self) -> Result<Option<Page>, WizardError> {
        Ok(self.step_one_complete()?.container)
    }

    pub fn get_success_url(&self, obj: &Page) -> Result<String, WizardError> {
        let entry = self.get_selected_entry()?;
        Ok(entry.get_success_url(obj, &self.request.language))
    }

    pub fn get_step_2_base_form(&self) -> Step2BaseForm {
        Step2BaseForm
    }

    /// Arguments for the form of `step`. Unknown or malformed container keys
    /// resolve to no container.
    pub fn get_form_kwargs(&self, step: Step, page_pk: Option<&str>) -> Result<FormKwargs, WizardError> {
        let page = match step {
            Step::Two => match self.phase()? {
                WizardPhase::StepOneComplete(done) => done.container,
                WizardPhase::Unvalidated => None,
            },
            Step::One => self
                .ctx
                .store
                .find_page(page_pk.or(self.request.page_hint.as_deref())),
        };
        Ok(FormKwargs {
            user: self.request.user.clone(),
            language: self.request.language.clone(),
            page,
        })
    }

    pub fn get_form_initial(&self, step: Step) -> RawData {
        let mut initial = RawData::new();
        if step == Step::One {
            if let Some(hint) = &self.request.page_hint {
                initial.insert("page".into(), hint.clone());
            }
        }
        initial
    }

    fn form_class(&self, step: Step, kwargs: &FormKwargs) -> Result<FormClass, WizardError> {
        match step {
            Step::One => Ok(FormClass::StepOne(Step1Form::new(self.ctx.registry, kwargs))),
            Step::Two => match self.phase()? {
                WizardPhase::StepOneComplete(done) => Ok(done.step_two_form_class(self.get_step_2_base_form())),
                WizardPhase::Unvalidated => {
                    tracing::warn!(session = %self.session.id, "Step two resolved before step one validated");
                    Ok(FormClass::Placeholder)
                }
            },
        }
    }

    fn bind_form(
        &self,
        step: Step,
        data: Option<RawData>,
        files: StagedFiles,
        page_pk: Option<&str>,
    ) -> Result<StepForm, WizardError> {
        let kwargs = self.get_form_kwargs(step, page_pk)?;
        let class = self.form_class(step, &kwargs)?;
        Ok(StepForm::new(step, class, kwargs, data, files, self.get_form_initial(step)))
    }

    /// Resolve and instantiate the form for `step` (the current step when
    /// `None`), bound to `data` if given.
    pub fn get_form(
        &mut self,
        step: Option<Step>,
        data: Option<RawData>,
        files: Option<StagedFiles>,
    ) -> Result<StepForm, WizardError> {
        let step = step.unwrap_or_else(|| self.steps_current());
        self.page_pk = data
            .as_ref()
            .and_then(|d| d.get(&step.field_key("page")).cloned());
        let page_pk = self.page_pk.clone();
        self.bind_form(step, data, files.unwrap_or_default(), page_pk.as_deref())
    }

    pub fn get_template_names(&self) -> Result<String, WizardError> {
        match self.get_current_step() {
            None | Some(Step::One) => Ok(START_TEMPLATE.to_string()),
            Some(Step::Two) => Ok(self.get_selected_entry()?.template_name().to_string()),
        }
    }

    fn render(&self, form: StepForm) -> Result<WizardResponse, WizardError> {
        let template_name = self.get_template_names()?;
        let entry = if self.is_second_step(None) {
            Some(self.get_selected_entry()?)
        } else {
            None
        };
        Ok(WizardResponse::Render(StepView {
            step: form.step(),
            template_name,
            form,
            entry,
        }))
    }

    /// Clear all progress. The session is reset even when discarding the
    /// staged uploads fails; the error is still returned.
    async fn reset(&mut self) -> Result<(), WizardError> {
        let discarded = self.ctx.files.discard_session(&self.session.id).await;
        self.session.reset();
        discarded.map_err(WizardError::from)
    }

    fn stored(&self, step: Step) -> (Option<RawData>, Option<StagedFiles>) {
        (
            self.session.data_for_step(step).cloned(),
            Some(self.session.files_for_step(step)),
        )
    }

    /// Start over and show step one.
    pub async fn get(&mut self) -> Result<WizardResponse, WizardError> {
        self.reset().await?;
        tracing::info!(session = %self.session.id, language = %self.request.language, "Wizard started");
        let form = self.get_form(Some(Step::One), None, None)?;
        self.render(form)
    }

    /// Handle a step submission.
    pub async fn post(&mut self, data: RawData, uploads: Vec<UploadedFile>) -> Result<WizardResponse, WizardError> {
        if let Some(raw) = data.get(GOTO_STEP_FIELD) {
            let goto = Step::parse(raw).ok_or(WizardError::ManagementForm)?;
            if goto > self.steps_current() {
                return Err(WizardError::ManagementForm);
            }
            self.session.current_step = Some(goto);
            let (stored, files) = self.stored(goto);
            let form = self.get_form(Some(goto), stored, files)?;
            return self.render(form);
        }

        let form_step = data
            .get(MANAGEMENT_FIELD)
            .and_then(|s| Step::parse(s))
            .ok_or(WizardError::ManagementForm)?;
        if self.session.current_step.is_some() && Some(form_step) != self.session.current_step {
            // The client re-submitted an earlier page (back button or reload).
            self.session.current_step = Some(form_step);
        }

        let step = self.steps_current();
        if step == Step::Two && matches!(self.phase()?, WizardPhase::Unvalidated) {
            tracing::warn!(session = %self.session.id, "Step one no longer validates; returning to it");
            self.session.current_step = Some(Step::One);
            let (stored, files) = self.stored(Step::One);
            let form = self.get_form(Some(Step::One), stored, files)?;
            return self.render(form);
        }

        let prefix = format!("{}-", step);
        let mut files = StagedFiles::new();
        for upload in uploads {
            if upload.field.starts_with(&prefix) && !upload.file_name.is_empty() {
                let staged = self.ctx.files.stage(&self.session.id, upload).await?;
                files.insert(staged.field.clone(), staged);
            }
        }

        let mut form = self.get_form(Some(step), Some(data.clone()), Some(files.clone()))?;
        if !form.is_valid() {
            return self.render(form);
        }
        self.session.set_step_data(step, data);
        self.session.set_step_files(step, files);
        tracing::info!(session = %self.session.id, step = %step, "Step validated");
        match step.next() {
            Some(next) => {
                self.session.current_step = Some(next);
                let (stored, files) = self.stored(next);
                let form = self.get_form(Some(next), stored, files)?;
                self.render(form)
            }
            None => self.render_done().await,
        }
    }

    async fn render_done(&mut self) -> Result<WizardResponse, WizardError> {
        let mut form_list = Vec::with_capacity(Step::ALL.len());
        for step in Step::ALL {
            let (stored, files) = self.stored(step);
            let mut form = self.get_form(Some(step), stored, files)?;
            if !form.is_valid() {
                tracing::warn!(session = %self.session.id, step = %step, "Stored step failed revalidation");
                self.session.current_step = Some(step);
                return self.render(form);
            }
            form_list.push(form);
        }
        let completed = self.done(form_list).await?;
        // The object is committed; leftover uploads must not turn this into an error.
        if let Err(e) = self.reset().await {
            tracing::warn!(%e, session = %self.session.id, "Failed to discard staged uploads after finishing");
        }
        Ok(WizardResponse::Done(completed))
    }

    /// Create the object from step two's form and work out where to send the
    /// client. Nothing is committed unless both succeed.
    pub async fn done(&self, form_list: Vec<StepForm>) -> Result<Completed, WizardError> {
        let step_one = self.step_one_complete()?;
        if !step_one
            .entry
            .user_has_add_permission(&self.request.user, step_one.container.as_ref())
        {
            return Err(WizardError::PermissionDenied(step_one.entry.title().to_string()));
        }
        let form_two = form_list
            .into_iter()
            .find(|f| f.step() == Step::Two)
            .ok_or(WizardError::InvalidForm(Step::Two))?;
        let completed = self
            .ctx
            .store
            .atomic(|tx| {
                let instance = form_two.save(tx)?;
                let url = self.get_success_url(&instance)?;
                Ok::<_, WizardError>(step_one.finish(instance, url))
            })
            .await?;
        tracing::info!(
            entry = completed.entry.id(),
            object = completed.object.id,
            url = %completed.url,
            "Wizard finished"
        );
        Ok(completed)
    }
}
