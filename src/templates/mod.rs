// Wizard templates
pub mod message_template;
pub mod wizard_create_template;
pub mod wizard_done_template;
pub mod wizard_start_template;

// Re-export all templates
pub use message_template::MessageTemplate;
pub use wizard_create_template::WizardCreateTemplate;
pub use wizard_done_template::WizardDoneTemplate;
pub use wizard_start_template::WizardStartTemplate;
