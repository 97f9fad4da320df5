pub mod controller;
pub mod entries;
pub mod error;
pub mod files;
pub mod forms;
pub mod language;
pub mod registry;
pub mod step;
pub mod storage;

// Re-export commonly used items
pub use controller::{
    Completed, StepOneComplete, StepView, WizardContext, WizardController, WizardPhase, WizardRequest,
    WizardResponse, DONE_TEMPLATE, START_TEMPLATE,
};
pub use entries::{register_defaults, PageForm, PAGE_ENTRY_ID, SUB_PAGE_ENTRY_ID};
pub use error::WizardError;
pub use files::{FileStaging, StagedFile, StagedFiles, UploadedFile};
pub use forms::{
    step2_form_factory, CleanedData, EntryForm, FieldSpec, FormClass, FormErrors, FormKwargs, RawData,
    Step1Form, Step2BaseForm, StepForm,
};
pub use language::LanguageSettings;
pub use registry::{EntryDescriptor, EntryRegistry, RegistryBuilder, RegistryError};
pub use step::Step;
pub use storage::{WizardSession, WizardStorage};
