//! Fixed-period publish loop.
//!
//! [`PublishLoop`] stands in for the host simulator's scheduler: it asks a
//! [`PoseSource`] for the pose bundle at each publish time
//! `t_k = k · draw_period` and hands it to the visualizer.  Simulation time is
//! paced against the wall clock by `target_realtime_rate`; a rate of `0`
//! runs as fast as possible.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use meshbridge_middleware::RemoteScene;
use meshbridge_types::{PoseBundle, PoseLog, VizError};
use tracing::{debug, info, instrument};

use crate::visualizer::MeshcatVisualizer;

/// Something that can report frame poses at a given simulation time.
pub trait PoseSource {
    /// Pose bundle at `time` seconds.  The same frame names must appear in
    /// the same order on every call.
    fn pose_bundle(&mut self, time: f64) -> &PoseBundle;
}

#[derive(Debug, Clone)]
pub struct PublishLoop {
    period: Duration,
    duration: f64,
    target_realtime_rate: f64,
    record_log: bool,
    shutdown: Option<Arc<AtomicBool>>,
}

/// What a finished [`PublishLoop::run`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopSummary {
    pub publishes: u64,
    /// Simulation time of the last publish, seconds.
    pub final_time: f64,
    pub poses_sent: usize,
    /// Pose entries for unknown frames, summed over all publishes.
    pub unknown_poses: usize,
    /// `true` when the shutdown flag ended the run early.
    pub interrupted: bool,
    /// Every published bundle, when recording was enabled.
    pub log: Option<PoseLog>,
}

impl PublishLoop {
    /// Loop publishing every `period` until simulation time `duration`
    /// (seconds), at real-time pace.
    pub fn new(period: Duration, duration: f64) -> Self {
        Self {
            period,
            duration,
            target_realtime_rate: 1.0,
            record_log: false,
            shutdown: None,
        }
    }

    /// Simulation seconds per wall-clock second.  Non-positive values disable
    /// pacing.
    pub fn with_target_realtime_rate(mut self, rate: f64) -> Self {
        self.target_realtime_rate = rate;
        self
    }

    pub fn with_pose_log(mut self, record: bool) -> Self {
        self.record_log = record;
        self
    }

    /// Stop before the next publish once `flag` becomes `true`.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Publish times `0, period, 2·period, …` up to and including `duration`.
    pub fn publish_times(&self) -> impl Iterator<Item = f64> + '_ {
        let step = self.period.as_secs_f64();
        let end = self.duration;
        (0u64..)
            .map(move |k| k as f64 * step)
            .take_while(move |t| step > 0.0 && *t <= end + 1e-9)
    }

    /// Wall-clock instant at which simulation `time` is due, or `None` when
    /// pacing is off.
    fn due_at(&self, started: Instant, time: f64) -> Result<Option<Instant>, VizError> {
        let rate = self.target_realtime_rate;
        if rate <= 0.0 {
            return Ok(None);
        }
        let offset = Duration::try_from_secs_f64(time / rate).map_err(|e| {
            VizError::Schedule(format!("{time} s of simulation at rate {rate}: {e}"))
        })?;
        started.checked_add(offset).map(Some).ok_or_else(|| {
            VizError::Schedule(format!("{time} s of simulation at rate {rate} overflows the clock"))
        })
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Drive `visualizer` from `source` until the duration elapses or the
    /// shutdown flag is raised.  The first publish error ends the run.
    ///
    /// A rate so small that the end of the run cannot be placed on the wall
    /// clock is rejected with [`VizError::Schedule`] before anything is
    /// published.
    #[instrument(skip_all, fields(period_s = self.period.as_secs_f64(), duration_s = self.duration))]
    pub fn run<S, P>(
        &self,
        visualizer: &mut MeshcatVisualizer<S>,
        source: &mut P,
    ) -> Result<LoopSummary, VizError>
    where
        S: RemoteScene,
        P: PoseSource + ?Sized,
    {
        let mut summary = LoopSummary {
            log: self.record_log.then(PoseLog::default),
            ..LoopSummary::default()
        };
        let started = Instant::now();
        self.due_at(started, self.duration)?;

        for time in self.publish_times() {
            if self.shutdown_requested() {
                info!(time, "shutdown requested; stopping publish loop");
                summary.interrupted = true;
                break;
            }

            if let Some(due) = self.due_at(started, time)? {
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
            }

            let bundle = source.pose_bundle(time);
            let report = visualizer.publish(bundle)?;
            if let Some(log) = summary.log.as_mut() {
                log.record(time, bundle.clone());
            }

            summary.publishes += 1;
            summary.final_time = time;
            summary.poses_sent += report.poses_sent;
            summary.unknown_poses += report.unknown_frames.len();
        }

        debug!(
            publishes = summary.publishes,
            wall_s = started.elapsed().as_secs_f64(),
            "publish loop finished"
        );
        Ok(summary)
    }
}
