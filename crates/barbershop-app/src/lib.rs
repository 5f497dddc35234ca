// Event-loop orchestration between the ranking core and the terminal UI.

pub mod app;
