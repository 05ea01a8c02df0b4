pub mod rate_ingestion;
