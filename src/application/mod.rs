// Application layer - Use cases and the repository seam
pub mod cell_log_repository;
pub mod dashboard_service;
