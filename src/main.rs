use anyhow::Context;
use log::info;
use memstress::{Cancellation, StressConfig, StressTest};

fn main() -> anyhow::Result<()> {
    memstress::logging::init();

    let cancellation = Cancellation::on_interrupt().context("unable to watch for Ctrl+C")?;
    let summary = StressTest::new(StressConfig::default(), std::io::stdout().lock())
        .cancellation(cancellation)
        .run()?;

    // Exhausting the memory is the goal of the test, so both outcomes exit successfully.
    info!(
        "exiting with {} blocks still allocated ({:?})",
        summary.retained().len(),
        summary.outcome()
    );
    Ok(())
}
