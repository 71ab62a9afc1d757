// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod query_cache;
pub mod supabase_repository;
