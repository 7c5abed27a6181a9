use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the stderr subscriber. `verbose` lowers the level to DEBUG, which
/// also surfaces dropped hidden-branch input.
pub(crate) fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok(); // Already installed in tests
}
