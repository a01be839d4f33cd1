//! Phase timing around any [`Builder`].

use std::time::{Duration, Instant};

use tracing::Span;

use crate::builder::{BuildPhase, Builder};
use crate::util::errors::BuildError;

/// Elapsed wall-clock time of one finished phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    pub phase: BuildPhase,
    pub elapsed: Duration,
    pub succeeded: bool,
}

/// Wraps a builder and logs how long each phase took.
///
/// Results of the wrapped builder are returned untouched.
#[derive(Debug)]
pub struct TimedBuilder<B> {
    inner: B,
    span: Span,
    timings: Vec<PhaseTiming>,
}

impl<B: Builder> TimedBuilder<B> {
    pub fn new(inner: B, span: Span) -> Self {
        TimedBuilder {
            inner,
            span,
            timings: Vec::new(),
        }
    }

    /// Timings of the phases run so far, in order.
    pub fn timings(&self) -> &[PhaseTiming] {
        &self.timings
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn timed(
        &mut self,
        phase: BuildPhase,
        run: impl FnOnce(&mut B) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        let start = Instant::now();
        let result = run(&mut self.inner);
        let elapsed = start.elapsed();

        self.span.in_scope(|| {
            tracing::info!(
                "{} took {:.3} seconds",
                phase.description(),
                elapsed.as_secs_f64()
            );
        });
        self.timings.push(PhaseTiming {
            phase,
            elapsed,
            succeeded: result.is_ok(),
        });
        result
    }
}

impl<B: Builder> Builder for TimedBuilder<B> {
    fn configure(&mut self) -> Result<(), BuildError> {
        self.timed(BuildPhase::Configure, |b| b.configure())
    }

    fn build(&mut self) -> Result<(), BuildError> {
        self.timed(BuildPhase::Build, |b| b.build())
    }

    fn install(&mut self) -> Result<(), BuildError> {
        self.timed(BuildPhase::Install, |b| b.install())
    }
}
