// UI module - user-facing dialogs
//
// This module contains:
// - Prompter: the dialog trait every action talks to
// - NativePrompter: modal message boxes and file pickers via rfd
// - HeadlessPrompter: stdout output for terminals and scripted runs

pub mod dialogs;

pub use dialogs::{HeadlessPrompter, NativePrompter, Prompter};
