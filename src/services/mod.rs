pub mod air_quality_source;
