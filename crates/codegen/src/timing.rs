//! Pass timing.
//!
//! Every timed pass has a function here returning a [`TimingToken`]; the pass is timed until the
//! token is dropped. Passes may nest, in which case the inner pass's time is subtracted from the
//! outer pass's self time. Times accumulate per thread until [`take_current`] collects them.

use core::fmt;
use std::cell::{Cell, RefCell};
use std::mem;
use std::time::{Duration, Instant};

// Declares the `Pass` enum together with one `snake_case()` constructor per pass.
macro_rules! timed_passes {
    ($($func:ident / $variant:ident: $desc:literal,)+) => {
        /// A pass that can be timed.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Pass {
            $(#[doc = $desc] $variant,)+
        }

        impl Pass {
            /// All timed passes, in report order.
            pub const ALL: &'static [Pass] = &[$(Pass::$variant),+];

            /// What the pass does, as shown in the timing report.
            pub fn description(self) -> &'static str {
                match self {
                    $(Pass::$variant => $desc,)+
                }
            }
        }

        $(
            #[doc = concat!("Start timing: ", $desc, ".")]
            #[must_use]
            pub fn $func() -> TimingToken {
                TimingToken::start(Pass::$variant)
            }
        )+
    };
}

timed_passes! {
    process_file / ProcessFile: "Processing test file",
    parse_text / ParseText: "Parsing textual IR",
    interpret / Interpret: "Interpreting IR",
    verifier / Verifier: "Verify IR",
    optimize / Optimize: "Optimization pipeline",
    cube_fold / CubeFold: "Binomial cube folding",
    dce / Dce: "Dead code elimination",
}

const NUM_PASSES: usize = Pass::ALL.len();

impl Pass {
    fn idx(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

thread_local! {
    static CURRENT_PASS: Cell<Option<Pass>> = const { Cell::new(None) };
    static PASS_TIMES: RefCell<PassTimes> = RefCell::new(PassTimes::default());
}

/// Times one run of a pass, from creation until it is dropped.
///
/// Tokens must be dropped in the reverse order of their creation.
pub struct TimingToken {
    pass: Pass,
    outer: Option<Pass>,
    start: Instant,
}

impl TimingToken {
    fn start(pass: Pass) -> Self {
        let outer = CURRENT_PASS.with(|current| current.replace(Some(pass)));
        log::debug!("timing: {pass} started");
        Self {
            pass,
            outer,
            start: Instant::now(),
        }
    }
}

impl Drop for TimingToken {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let current = CURRENT_PASS.with(|current| current.replace(self.outer));
        debug_assert_eq!(current, Some(self.pass), "timing tokens dropped out of order");
        log::debug!("timing: {} finished after {elapsed:?}", self.pass);
        PASS_TIMES.with(|times| times.borrow_mut().record(self.pass, self.outer, elapsed));
    }
}

/// Accumulated run counts and times of every pass.
#[derive(Clone, Debug, Default)]
pub struct PassTimes {
    runs: [u32; NUM_PASSES],
    total: [Duration; NUM_PASSES],
    nested: [Duration; NUM_PASSES],
}

impl PassTimes {
    fn record(&mut self, pass: Pass, outer: Option<Pass>, elapsed: Duration) {
        self.runs[pass.idx()] += 1;
        self.total[pass.idx()] += elapsed;
        if let Some(outer) = outer {
            self.nested[outer.idx()] += elapsed;
        }
    }

    /// How many times `pass` ran.
    pub fn runs(&self, pass: Pass) -> u32 {
        self.runs[pass.idx()]
    }

    /// Time spent in `pass`, including the passes it ran.
    pub fn total(&self, pass: Pass) -> Duration {
        self.total[pass.idx()]
    }

    /// Time spent in `pass` itself.
    pub fn self_time(&self, pass: Pass) -> Duration {
        self.total[pass.idx()].saturating_sub(self.nested[pass.idx()])
    }

    /// Wall time covered by all the measured passes.
    pub fn overall(&self) -> Duration {
        Pass::ALL.iter().map(|&pass| self.self_time(pass)).sum()
    }
}

impl fmt::Display for PassTimes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{:<30} {:>6} {:>10} {:>10}", "Pass", "Runs", "Total", "Self")?;
        for &pass in Pass::ALL.iter().filter(|&&pass| self.runs(pass) > 0) {
            writeln!(
                f,
                "{:<30} {:>6} {:>9.3}s {:>9.3}s",
                pass.description(),
                self.runs(pass),
                self.total(pass).as_secs_f64(),
                self.self_time(pass).as_secs_f64(),
            )?;
        }
        writeln!(f, "{:<30} {:>6} {:>9.3}s", "Overall", "", self.overall().as_secs_f64())
    }
}

/// Take the timings accumulated on this thread, resetting them.
pub fn take_current() -> PassTimes {
    PASS_TIMES.with(|times| mem::take(&mut *times.borrow_mut()))
}
