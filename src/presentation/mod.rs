// Presentation layer - terminal dashboard (ratatui)
pub mod app;
pub mod ui;
