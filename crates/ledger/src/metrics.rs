//! Lightweight ambient instrumentation via the `metrics` crate (already a
//! teacher dependency in `reth-exex` and `reth-transaction-pool`). This is
//! not the HTTP metrics-exporter surface, just the same
//! `metrics::counter!`/`gauge!` call sites the teacher sprinkles through
//! its hot paths.

pub fn record_block_sealed() {
    metrics::counter!("ledger_blocks_sealed_total").increment(1);
}

pub fn record_record_failed() {
    metrics::counter!("ledger_records_failed_total").increment(1);
}

pub fn set_pending_records(count: usize) {
    metrics::gauge!("ledger_pending_records").set(count as f64);
}
