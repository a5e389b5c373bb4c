#![allow(clippy::collapsible_if)]

pub mod diagnostics;
pub mod language;
pub mod project;
