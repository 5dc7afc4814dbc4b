use criterion::Criterion;
use std::time::Duration;

#[allow(unused_mut)]
pub fn criterion() -> Criterion {
    let mut out = Criterion::default().warm_up_time(Duration::from_millis(500));
    #[cfg(unix)]
    {
        use pprof::criterion::{Output, PProfProfiler};
        out = out.with_profiler(PProfProfiler::new(1000, Output::Flamegraph(None)));
    }
    out.configure_from_args()
}

pub const SIZES: [usize; 4] = [0, 8, 256, 4096];
