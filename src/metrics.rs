use lazy_static::lazy_static;
use prometheus::register_int_counter;
use prometheus::register_int_gauge;
use prometheus::IntCounter;
use prometheus::IntGauge;

lazy_static! {
    pub static ref OPEN_SCRATCHES_GAUGE: IntGauge = register_int_gauge!(
        "snapshot_staging_open_scratches",
        "Number of snapshot scratch spaces currently open"
    )
    .expect("metric can not be created");

    pub static ref STAGED_BYTES_TOTAL: IntCounter = register_int_counter!(
        "snapshot_staging_written_bytes_total",
        "Total bytes written into snapshot staging files"
    )
    .expect("metric can not be created");

    pub static ref RANGE_DIR_RECLAIM_FAILURES: IntCounter = register_int_counter!(
        "snapshot_staging_range_dir_reclaim_failures",
        "Best-effort removals of range staging directories that failed"
    )
    .expect("metric can not be created");
}
