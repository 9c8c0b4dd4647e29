// User-facing dialogs
//
// The actions only talk to the user through the Prompter trait. NativePrompter
// shows modal message boxes and file pickers via rfd; HeadlessPrompter prints
// to stdout and answers confirmations with a fixed value, for terminals and
// scripted runs.

use camino::Utf8PathBuf;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

/// Modal dialogs driven by probe outcomes.
pub trait Prompter {
    /// Yes/no question. `true` means the user agreed.
    fn confirm(&self, title: &str, message: &str) -> bool;

    fn inform(&self, title: &str, message: &str);

    fn warn(&self, title: &str, message: &str);

    /// Ask for a file. `None` when cancelled or unsupported.
    fn pick_file(&self, title: &str, filter_name: &str, extensions: &[&str]) -> Option<Utf8PathBuf>;
}

/// Native message boxes
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePrompter;

impl Prompter for NativePrompter {
    fn confirm(&self, title: &str, message: &str) -> bool {
        let result = MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::YesNo)
            .show();

        matches!(result, MessageDialogResult::Yes)
    }

    fn inform(&self, title: &str, message: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn warn(&self, title: &str, message: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn pick_file(&self, title: &str, filter_name: &str, extensions: &[&str]) -> Option<Utf8PathBuf> {
        FileDialog::new()
            .set_title(title)
            .add_filter(filter_name, extensions)
            .pick_file()
            .and_then(|path| {
                Utf8PathBuf::try_from(path)
                    .map_err(|e| {
                        tracing::error!("Failed to convert path to UTF-8: {}", e);
                        e
                    })
                    .ok()
            })
    }
}

/// Terminal output, confirmations answered with `assume_yes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessPrompter {
    pub assume_yes: bool,
}

impl HeadlessPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompter for HeadlessPrompter {
    fn confirm(&self, title: &str, message: &str) -> bool {
        let answer = if self.assume_yes { "yes" } else { "no" };
        println!("[{}] {}\n  -> {}", title, message, answer);
        self.assume_yes
    }

    fn inform(&self, title: &str, message: &str) {
        println!("[{}] {}", title, message);
    }

    fn warn(&self, title: &str, message: &str) {
        println!("[{}] WARNING: {}", title, message);
    }

    fn pick_file(&self, title: &str, _filter_name: &str, _extensions: &[&str]) -> Option<Utf8PathBuf> {
        tracing::debug!("File picker '{}' unavailable in headless mode", title);
        None
    }
}
