use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

lazy_static::lazy_static! {
    pub static ref EVENTS_STORED: IntGauge = register_int_gauge!(
        "eventbuf_events_stored",
        "Number of events currently held in the store"
    ).unwrap();

    pub static ref EVENTS_APPENDED: IntCounter = register_int_counter!(
        "eventbuf_events_appended_total",
        "Events accepted by the API"
    ).unwrap();

    pub static ref PRUNE_RUNS: IntCounter = register_int_counter!(
        "eventbuf_prune_runs_total",
        "Prune triggers, including the one at startup"
    ).unwrap();

    pub static ref PRUNE_FAILURES: IntCounter = register_int_counter!(
        "eventbuf_prune_failures_total",
        "Prune triggers that returned an error"
    ).unwrap();

    pub static ref EVENTS_PRUNED: IntCounter = register_int_counter!(
        "eventbuf_events_pruned_total",
        "Events removed for being older than the retention period"
    ).unwrap();

    pub static ref DUMPS: IntCounter = register_int_counter!(
        "eventbuf_dumps_total",
        "Snapshots served by the internal API"
    ).unwrap();
}

/// Forces registration so every metric shows up in the first scrape.
pub fn register() {
    lazy_static::initialize(&EVENTS_STORED);
    lazy_static::initialize(&EVENTS_APPENDED);
    lazy_static::initialize(&PRUNE_RUNS);
    lazy_static::initialize(&PRUNE_FAILURES);
    lazy_static::initialize(&EVENTS_PRUNED);
    lazy_static::initialize(&DUMPS);
}
