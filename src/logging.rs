use std::io::Write;
use std::time::Instant;

use log::LevelFilter;
use once_cell::sync::Lazy;

static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Installs the stderr logger: `[mm:ss] LEVEL message`, elapsed since start.
///
/// `verbose` raises the level above `RUST_LOG` (1 = debug, 2+ = trace).
pub fn init(verbose: u8) {
    Lazy::force(&START);
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.format(|buf, record| {
        let ts = fmt_elapsed(START.elapsed().as_secs_f64());
        writeln!(buf, "[{ts}] {:<5} {}", record.level(), record.args())
    });
    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

pub fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
