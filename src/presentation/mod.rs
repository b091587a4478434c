// Presentation layer - Text output of dashboard state
pub mod dashboard_view;
