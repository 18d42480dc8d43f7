use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use heapless::Vec;
use ramp_core::{
    mk_static,
    utils::{
        config::{PoolConfig, MAX_RAMP_UNITS},
        controllers::{
            isr::{on_update_interrupt, share, with_pool, CompletionChannel, SharedRampPool},
            Axis, AxisId, AxisState, RampComplete, RampPool, RampProfile, UnitHandle, UnitId,
        },
        hal::SimTimer,
        math::ramp::RampMode,
    },
};
use tracing::{debug, error, info, trace, warn};

/// Upper bound on simulated axes.
const MAX_AXES: usize = 8;
/// Give up if the scenario has not settled after this many ticks.
const MAX_TICKS: u64 = 1_000_000;

type Pool = SharedRampPool<'static, SimTimer, MAX_RAMP_UNITS>;

static EVENTS: CompletionChannel = CompletionChannel::new();

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON board description (ramp limits and timer interrupt lines)
    #[clap(long)]
    config: Option<PathBuf>,
    /// number of axes competing for ramp units
    #[clap(long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(1..=MAX_AXES as i64))]
    axes: u8,
    /// timer counts per simulated tick
    #[clap(long, default_value_t = 250)]
    step: u16,
    /// accelerate/cruise/decelerate cycles per axis
    #[clap(long, default_value_t = 2)]
    cycles: u32,
    /// ticks spent at full speed between ramps
    #[clap(long, default_value_t = 40)]
    cruise: u32,
    /// axis 0 skips its first release and parks, leaving a stale lock for
    /// the other axes to reclaim
    #[clap(long)]
    leak_release: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    Accelerating(UnitHandle),
    Cruising { unit: UnitHandle, left: u32 },
    Decelerating(UnitHandle),
    Finished,
}

/// Motion-control side of one axis.
struct AxisRun {
    axis: &'static AxisState,
    phase: Phase,
    cycles: u32,
    leak_next_release: bool,
}

impl AxisRun {
    fn id(&self) -> AxisId {
        self.axis.id()
    }

    /// Foreground step: request a unit, or leave cruise.
    fn poll(
        &mut self,
        pool: &Pool,
        cruise: u32,
    ) {
        match self.phase {
            Phase::Waiting => {
                self.axis.set_busy(true);
                let axis: &'static dyn Axis = self.axis;
                let started = with_pool(pool, |p| {
                    let unit = p.acquire(axis)?;
                    p.start(unit, RampMode::Accelerating);
                    Some(unit)
                });
                match started {
                    Some(unit) => {
                        debug!(axis = self.id().0, unit = unit.id().0, "accelerating");
                        self.phase = Phase::Accelerating(unit);
                    }
                    None => self.axis.set_busy(false),
                }
            }
            Phase::Cruising { unit, left: 0 } => {
                with_pool(pool, |p| p.start(unit, RampMode::Decelerating));
                debug!(axis = self.id().0, unit = unit.id().0, "decelerating");
                self.phase = Phase::Decelerating(unit);
            }
            Phase::Cruising { unit, left } => {
                if left == cruise {
                    let speed = with_pool(pool, |p| p.cur_speed(unit));
                    trace!(axis = self.id().0, speed, "cruising");
                }
                self.phase = Phase::Cruising {
                    unit,
                    left: left - 1,
                };
            }
            Phase::Accelerating(_) | Phase::Decelerating(_) | Phase::Finished => {}
        }
    }

    /// Interrupt-side completion delivered to this axis.
    fn complete(
        &mut self,
        pool: &Pool,
        done: RampComplete,
        cruise: u32,
        target: u32,
    ) {
        match self.phase {
            Phase::Accelerating(unit) if unit.id() == done.unit => {
                info!(axis = self.id().0, speed = done.speed, "reached full speed");
                self.phase = Phase::Cruising { unit, left: cruise };
            }
            Phase::Decelerating(unit) if unit.id() == done.unit => {
                info!(axis = self.id().0, speed = done.speed, "stopped");
                self.axis.set_busy(false);
                self.cycles += 1;
                if self.leak_next_release {
                    // park without releasing, so the unit stays bound to an
                    // idle axis until another axis reclaims it
                    warn!(axis = self.id().0, unit = unit.id().0, "skipping release and parking");
                    self.leak_next_release = false;
                    self.phase = Phase::Finished;
                    return;
                }
                with_pool(pool, |p| p.release(self.id()));
                self.phase = if self.cycles >= target {
                    Phase::Finished
                } else {
                    Phase::Waiting
                };
            }
            phase => {
                warn!(axis = self.id().0, ?phase, ?done, "completion for a ramp this axis is not running");
            }
        }
    }
}

/// One tick of simulated timer hardware: advance every counter and raise the
/// update interrupt of each timer that reached its period.
fn tick_hardware(
    pool: &Pool,
    step: u16,
) {
    let fired: Vec<UnitId, MAX_RAMP_UNITS> = with_pool(pool, |p| {
        p.units_mut()
            .filter_map(|u| u.timer_mut().tick(step).then(|| u.id()))
            .collect()
    });
    for unit in fired {
        on_update_interrupt(pool, unit, &EVENTS);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PoolConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let cfg = serde_json::from_str(&text)?;
            info!(path = %path.display(), "loaded pool config");
            Ok(cfg)
        }
        None => Ok(PoolConfig::default()),
    }
}

fn run(opts: Opts) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = load_config(opts.config.as_ref())?;

    let mut pool: RampPool<'static, SimTimer, MAX_RAMP_UNITS> =
        RampPool::from_config(&cfg, core::iter::repeat_with(SimTimer::new))?;
    pool.init_all();
    let lowest = pool.lowest_preemption_priority();
    info!(
        units = pool.len(),
        lowest_preemption_priority = lowest,
        bus_preemption_priority = lowest.saturating_add(1),
        "ramp pool ready"
    );
    let pool: &'static Pool = mk_static!(Pool, share(pool));

    let mut states: Vec<AxisState, MAX_AXES> = Vec::new();
    for i in 0..opts.axes {
        let step = u32::from(i);
        let profile = RampProfile {
            max_speed: 4_000 + 1_000 * u16::from(i),
            accel: 20_000 + 10_000 * step,
            decel: 30_000 + 10_000 * step,
        };
        // range-checked by clap against MAX_AXES
        let _ = states.push(AxisState::with_profile(AxisId(i), profile));
    }
    let states: &'static Vec<AxisState, MAX_AXES> = mk_static!(Vec<AxisState, MAX_AXES>, states);

    let mut runs: Vec<AxisRun, MAX_AXES> = states
        .iter()
        .map(|axis| AxisRun {
            axis,
            phase: Phase::Waiting,
            cycles: 0,
            leak_next_release: opts.leak_release && axis.id() == AxisId(0),
        })
        .collect();

    let mut ticks: u64 = 0;
    while runs.iter().any(|r| r.phase != Phase::Finished) {
        ticks += 1;
        if ticks > MAX_TICKS {
            return Err(format!("scenario did not settle after {MAX_TICKS} ticks").into());
        }

        tick_hardware(pool, opts.step);

        while let Ok(done) = EVENTS.try_receive() {
            match runs.iter_mut().find(|r| Some(r.id()) == done.axis) {
                Some(run) => run.complete(pool, done, opts.cruise, opts.cycles),
                None => warn!(?done, "completion for an unbound unit"),
            }
        }

        for run in runs.iter_mut() {
            run.poll(pool, opts.cruise);
        }
    }

    let diag = with_pool(pool, |p| p.diagnostics());
    info!(ticks, ?diag, "scenario finished");
    if opts.leak_release && diag.stale_lock_reclaimed == 0 {
        warn!("leaked unit was never reclaimed; run more axes than ramp units");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    match run(Opts::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("mock mcu failed: {e}");
            ExitCode::FAILURE
        }
    }
}
