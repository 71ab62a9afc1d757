// Domain layer - Pure data models, no I/O
pub mod cell_log;
pub mod view;
