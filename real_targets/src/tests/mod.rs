
/// Route `tracing` output through the test harness; `RUST_LOG=debug` shows extraction summaries.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
