//! Modal file dialogs used by the picker widget

use std::path::{Path, PathBuf};

/// What the picker asks the dialog for
#[derive(Debug, Clone, PartialEq)]
pub struct PickerRequest {
    pub title: String,
    pub select_directory: bool,
    pub apply_label: String,
    /// Location the dialog opens at
    pub current_path: Option<String>,
    /// Extension filters, ignored when selecting directories
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickerOutcome {
    Selected(PathBuf),
    Cancelled,
}

/// Blocking dialog collaborator
pub trait PickerDialog {
    fn pick(&self, request: &PickerRequest) -> PickerOutcome;

    /// Show a blocking error message with a single confirm button
    fn show_error(&self, message: &str);
}

/// Native dialogs through `rfd`
#[derive(Debug, Default, Clone, Copy)]
pub struct RfdPickerDialog;

impl PickerDialog for RfdPickerDialog {
    fn pick(&self, request: &PickerRequest) -> PickerOutcome {
        let mut dialog = rfd::FileDialog::new().set_title(request.title.as_str());

        if let Some(current) = request.current_path.as_deref().map(Path::new) {
            if current.is_dir() {
                dialog = dialog.set_directory(current);
            } else {
                if let Some(parent) = current.parent().filter(|parent| parent.is_dir()) {
                    dialog = dialog.set_directory(parent);
                }
                if let Some(name) = current.file_name() {
                    dialog = dialog.set_file_name(name.to_string_lossy());
                }
            }
        }

        let picked = if request.select_directory {
            dialog.pick_folder()
        } else {
            if !request.extensions.is_empty() {
                dialog = dialog.add_filter("USD Files", request.extensions.as_slice());
            }
            dialog.pick_file()
        };
        match picked {
            Some(path) => PickerOutcome::Selected(path),
            None => PickerOutcome::Cancelled,
        }
    }

    fn show_error(&self, message: &str) {
        rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Error)
            .set_title("Invalid selection")
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }
}
