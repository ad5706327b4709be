//! File and directory picker widget
//!
//! A text field plus a button opening a modal dialog. Typed paths are
//! validated on every keystroke and on commit, paths picked in the dialog
//! are validated before being accepted.

mod dialog;

pub use dialog::{PickerDialog, PickerOutcome, PickerRequest, RfdPickerDialog};

use crate::config::PropertyConfig;
use crate::constants;
use crate::events::{Event, Subscription};

/// Returns the reason a path is invalid, `None` when it's fine
pub type ValidateCallback = Box<dyn Fn(&str) -> Option<String>>;

/// Receives the accepted path, `None` when the committed field was invalid
pub type SelectedCallback = Box<dyn Fn(Option<&str>)>;

/// Style of the path field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStyle {
    Field,
    FieldError,
}

pub struct FilePickerWidget {
    title: String,
    select_directory: bool,
    validate: ValidateCallback,
    selected: SelectedCallback,
    current_path: Option<String>,
    apply_label: String,
    placeholder: String,
    extensions: Vec<String>,
    field_text: String,
    validation_error: Option<String>,
    dialog: Box<dyn PickerDialog>,
    opened: Event<()>,
    closed: Event<()>,
}

impl FilePickerWidget {
    pub fn new(
        title: impl Into<String>,
        select_directory: bool,
        validate: impl Fn(&str) -> Option<String> + 'static,
        selected: impl Fn(Option<&str>) + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            select_directory,
            validate: Box::new(validate),
            selected: Box::new(selected),
            current_path: None,
            apply_label: constants::picker::DEFAULT_APPLY_LABEL.to_string(),
            placeholder: String::new(),
            extensions: constants::picker::USD_FILE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            field_text: String::new(),
            validation_error: None,
            dialog: Box::new(RfdPickerDialog),
            opened: Event::new(),
            closed: Event::new(),
        }
    }

    pub fn with_config(mut self, config: &PropertyConfig) -> Self {
        self.extensions = config.usd_file_extensions.clone();
        self
    }

    pub fn with_current_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.current_path = Some(path.clone());
        self.on_field_changed(path);
        self
    }

    pub fn with_apply_label(mut self, label: impl Into<String>) -> Self {
        self.apply_label = label.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_dialog(mut self, dialog: impl PickerDialog + 'static) -> Self {
        self.dialog = Box::new(dialog);
        self
    }

    pub fn field_text(&self) -> &str {
        &self.field_text
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    /// Placeholder is only shown while the field is empty
    pub fn placeholder_visible(&self) -> bool {
        self.field_text.is_empty()
    }

    pub fn set_validation_error(&mut self, error: Option<String>) {
        self.validation_error = error.filter(|error| !error.is_empty());
    }

    pub fn field_style(&self) -> FieldStyle {
        match self.validation_error {
            Some(_) => FieldStyle::FieldError,
            None => FieldStyle::Field,
        }
    }

    pub fn field_tooltip(&self) -> String {
        match &self.validation_error {
            Some(error) => format!("ERROR: {}", error),
            None => String::new(),
        }
    }

    fn target_name(&self) -> &'static str {
        if self.select_directory {
            "directory"
        } else {
            "file"
        }
    }

    /// Validate the field on every keystroke
    pub fn on_field_changed(&mut self, text: impl Into<String>) {
        self.field_text = text.into();
        let error = (self.validate)(&self.field_text);
        self.set_validation_error(error);
    }

    /// Report the field value, or `None` when it's invalid
    pub fn on_field_committed(&mut self) {
        match &self.validation_error {
            Some(error) => {
                log::error!("The selected {} is invalid: {}", self.target_name(), error);
                (self.selected)(None);
            }
            None => (self.selected)(Some(self.field_text.as_str())),
        }
    }

    fn validation_failed_message(&self, file_name: &str) -> String {
        if !self.select_directory && file_name.trim().is_empty() {
            return constants::picker::MISSING_FILE_NAME_MESSAGE.to_string();
        }
        format!(
            "The selected {} is invalid: {}",
            self.target_name(),
            self.validation_error.as_deref().unwrap_or_default()
        )
    }

    /// Run the modal dialog until a valid path is picked or the user cancels
    pub fn open_dialog(&mut self) {
        self.opened.emit(&());
        let request = PickerRequest {
            title: self.title.clone(),
            select_directory: self.select_directory,
            apply_label: self.apply_label.clone(),
            current_path: self.current_path.clone(),
            extensions: if self.select_directory {
                Vec::new()
            } else {
                self.extensions.clone()
            },
        };

        loop {
            let path = match self.dialog.pick(&request) {
                PickerOutcome::Selected(path) => path,
                PickerOutcome::Cancelled => break,
            };
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let path = path.display().to_string();
            self.validation_error = (self.validate)(&path).filter(|error| !error.is_empty());
            if self.validation_error.is_none() {
                self.path_selected(path);
                break;
            }
            let message = self.validation_failed_message(&file_name);
            self.dialog.show_error(&message);
        }
        self.closed.emit(&());
    }

    fn path_selected(&mut self, path: String) {
        self.current_path = Some(path.clone());
        self.on_field_changed(path);
        (self.selected)(Some(self.field_text.as_str()));
    }

    pub fn subscribe_file_picker_opened(&self, callback: impl Fn() + 'static) -> Subscription {
        self.opened.subscribe(move |_| callback())
    }

    /// Called whether the dialog was confirmed or dismissed
    pub fn subscribe_file_picker_closed(&self, callback: impl Fn() + 'static) -> Subscription {
        self.closed.subscribe(move |_| callback())
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let style = self.field_style();
            let mut edit = egui::TextEdit::singleline(&mut self.field_text)
                .hint_text(self.placeholder.as_str())
                .desired_width(constants::picker::FIELD_WIDTH);
            if style == FieldStyle::FieldError {
                edit = edit.text_color(ui.visuals().error_fg_color);
            }
            let mut response = ui.add(edit);
            if self.validation_error.is_some() {
                response = response.on_hover_text(self.field_tooltip());
            }
            if response.changed() {
                let text = self.field_text.clone();
                self.on_field_changed(text);
            }
            if response.lost_focus() {
                self.on_field_committed();
            }
            if ui.button("📂").on_hover_text(self.title.as_str()).clicked() {
                self.open_dialog();
            }
        });
    }
}
