pub mod rule_sync;
