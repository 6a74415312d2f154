use crate::client::Probe;
use crate::Result;
use prometheus::core::{Collector, Desc, Describer};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};
use tracing::{debug, error, Span};

pub const NAMESPACE: &str = "olric";
pub const UP_HELP: &str = "Could the Olric server be reached.";

/// Reports `olric_up` by probing the node once per scrape.
///
/// Nothing is cached between scrapes: every `collect` dials a fresh
/// connection and builds its own gauge, so overlapping scrapes never share
/// metric state.
pub struct UpCollector<P> {
    probe: P,
    opts: Opts,
    desc: Desc,
    // Always 0; stands in if a per-scrape gauge cannot be built.
    down: Gauge,
    logger: Span,
}

impl<P: Probe> UpCollector<P> {
    pub fn new(probe: P, logger: Span) -> Result<Self> {
        let opts = Opts::new("up", UP_HELP).namespace(NAMESPACE);
        let desc = opts.describe()?;
        let down = Gauge::with_opts(opts.clone())?;

        Ok(Self {
            probe,
            opts,
            desc,
            down,
            logger,
        })
    }

    /// 1.0 when the node answered, 0.0 otherwise. Failures are logged here and
    /// go no further.
    pub fn probe_up(&self) -> f64 {
        self.logger.in_scope(|| match self.probe.check() {
            Ok(()) => {
                debug!(address = %self.probe.address(), "Olric is up");
                1.0
            }
            Err(e) if e.is_probe_failure() => {
                error!(address = %self.probe.address(), error = %e, "Olric probe failed");
                0.0
            }
            Err(e) => {
                error!(address = %self.probe.address(), error = %e, "Could not run Olric probe");
                0.0
            }
        })
    }
}

impl<P: Probe> Collector for UpCollector<P> {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let up = self.probe_up();

        match Gauge::with_opts(self.opts.clone()) {
            Ok(gauge) => {
                gauge.set(up);
                gauge.collect()
            }
            Err(e) => {
                error!(error = %e, "Failed to build olric_up gauge, reporting down");
                self.down.collect()
            }
        }
    }
}
