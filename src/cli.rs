//! CLI surface for the `philosopher` binary.
//!
//! - `seat <ID>`: be one philosopher process (ID 0 sets the table)
//! - `table`: launch all five philosopher processes and wait for them
//! - `simulate`: run all five as threads over the in-process backend
//! - `cleanup`: remove semaphore sets left behind by a crashed run

use std::process::{Child, Command};
use std::sync::Arc;
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, error, info, warn};

use crate::core::config::{Pace, TableConfig};
use crate::core::errors::{TableError, TableResult};
use crate::core::limits::{DEFAULT_COUNT_KEY, DEFAULT_FORK_KEY, INITIALIZER, NUM_PHILOSOPHERS};
use crate::core::types::{PhilosopherId, SemKey};
use crate::ipc::semaphore::{MemoryBackend, SemaphoreBackend};
use crate::monitoring::{FanOut, RecordingObserver, TracingObserver, Transition, TransitionObserver};
use crate::table::{self, AcquisitionOrder, ParticipantReport, Philosopher};

// =============================================================================
// Entry + global options
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "philosopher",
    version,
    about = "Dining philosophers over System V semaphores",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub table: TableArgs,

    /// Print participant reports as JSON on stdout.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options every philosopher of one table must agree on.
#[derive(Args, Debug, Clone)]
pub struct TableArgs {
    /// Fork pick-up order.
    #[arg(long, global = true, env = "PHIL_ORDER", value_enum, default_value_t = AcquisitionOrder::Ordered)]
    pub order: AcquisitionOrder,

    /// Delay units: seconds, milliseconds, or none.
    #[arg(long, global = true, env = "PHIL_PACE", value_enum, default_value_t = Pace::Classic)]
    pub pace: Pace,

    /// Key of the fork semaphore set.
    #[arg(long, global = true, env = "PHIL_FORK_KEY", default_value_t = DEFAULT_FORK_KEY.raw())]
    pub fork_key: i32,

    /// Key of the philosopher-count semaphore.
    #[arg(long, global = true, env = "PHIL_COUNT_KEY", default_value_t = DEFAULT_COUNT_KEY.raw())]
    pub count_key: i32,
}

impl TableArgs {
    pub fn config(&self) -> TableConfig {
        TableConfig::with_pace(self.pace)
            .order(self.order)
            .keys(SemKey(self.fork_key), SemKey(self.count_key))
    }

    /// Flags that reproduce these options in a child process
    fn forward(&self) -> Vec<String> {
        vec![
            "--order".into(),
            value_name(&self.order),
            "--pace".into(),
            value_name(&self.pace),
            "--fork-key".into(),
            self.fork_key.to_string(),
            "--count-key".into(),
            self.count_key.to_string(),
        ]
    }
}

fn value_name<V: ValueEnum>(value: &V) -> String {
    value
        .to_possible_value()
        .map(|p| p.get_name().to_string())
        .unwrap_or_default()
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one philosopher in this process.
    Seat {
        /// Philosopher identity, 0 through 4. Start 0 first.
        id: usize,
    },

    /// Launch all philosopher processes and wait for them.
    Table,

    /// Run all philosophers as threads with in-process semaphores.
    Simulate {
        /// Fixed RNG seed (philosopher i uses seed + i).
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Remove semaphore sets left under the configured keys.
    Cleanup,
}

// =============================================================================
// Dispatch
// =============================================================================

pub fn run(cli: Cli) -> TableResult<()> {
    let config = cli.table.config();
    match cli.command {
        Commands::Seat { id } => {
            let report = seat(kernel_backend()?, config, id)?;
            print_reports(cli.json, std::slice::from_ref(&report));
            Ok(())
        }
        Commands::Table => launch_table(&cli.table, cli.json),
        Commands::Simulate { seed } => {
            let reports = simulate(config, seed)?;
            print_reports(cli.json, &reports);
            Ok(())
        }
        Commands::Cleanup => {
            let backend = kernel_backend()?;
            let removed = table::clear_leftovers(backend.as_ref(), &config)?;
            info!(removed, "cleanup complete");
            Ok(())
        }
    }
}

#[cfg(target_os = "linux")]
fn kernel_backend() -> TableResult<Arc<dyn SemaphoreBackend>> {
    Ok(Arc::new(crate::ipc::semaphore::SysVBackend::new()))
}

#[cfg(not(target_os = "linux"))]
fn kernel_backend() -> TableResult<Arc<dyn SemaphoreBackend>> {
    Err(TableError::NotSupported(
        "System V semaphores are only wired up on Linux".to_string(),
    ))
}

fn print_reports(json: bool, reports: &[ParticipantReport]) {
    if !json {
        return;
    }
    for report in reports {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "failed to serialize report"),
        }
    }
}

/// Run one philosopher to completion against `backend`
pub fn seat(
    backend: Arc<dyn SemaphoreBackend>,
    config: TableConfig,
    id: usize,
) -> TableResult<ParticipantReport> {
    Philosopher::seat(backend, config, id, Arc::new(TracingObserver))?.run()
}

/// Run a whole table in this process
///
/// Philosophers are seated in id order (so 0 has set the table before
/// anyone else can pick up a fork), then each runs on its own thread.
pub fn simulate(config: TableConfig, seed: Option<u64>) -> TableResult<Vec<ParticipantReport>> {
    let backend: Arc<dyn SemaphoreBackend> = Arc::new(MemoryBackend::new());
    let recorder = Arc::new(RecordingObserver::new());
    let logged: Arc<dyn TransitionObserver> = Arc::new(TracingObserver);
    let recorded: Arc<dyn TransitionObserver> = recorder.clone();
    let observer: Arc<dyn TransitionObserver> = Arc::new(FanOut(vec![logged, recorded]));

    let mut seated = Vec::with_capacity(NUM_PHILOSOPHERS);
    for id in 0..NUM_PHILOSOPHERS {
        let philosopher = Philosopher::seat(backend.clone(), config.clone(), id, observer.clone())?;
        seated.push(match seed {
            Some(seed) => philosopher.with_seed(seed.wrapping_add(id as u64)),
            None => philosopher,
        });
    }

    let handles: Vec<_> = seated
        .into_iter()
        .map(|philosopher| {
            let id = philosopher.id();
            (id, thread::spawn(move || philosopher.run()))
        })
        .collect();

    let mut reports = Vec::with_capacity(NUM_PHILOSOPHERS);
    for (id, handle) in handles {
        let report = handle.join().map_err(|_| TableError::Launch {
            philosopher: id,
            message: "philosopher thread panicked".to_string(),
        })??;
        reports.push(report);
    }

    info!(
        meals = recorder.count(|t| matches!(t, Transition::Eating { .. })),
        last = ?reports.iter().find(|r| r.departure.is_last()).map(|r| r.philosopher),
        "simulation finished"
    );
    Ok(reports)
}

// =============================================================================
// Process launcher
// =============================================================================

fn spawn_seat(args: &TableArgs, json: bool, id: PhilosopherId) -> TableResult<Child> {
    let exe = std::env::current_exe().map_err(|e| TableError::Launch {
        philosopher: id,
        message: e.to_string(),
    })?;
    let mut command = Command::new(exe);
    command.args(args.forward()).arg("seat").arg(id.to_string());
    if json {
        command.arg("--json");
    }
    command.spawn().map_err(|e| TableError::Launch {
        philosopher: id,
        message: e.to_string(),
    })
}

/// Spawn philosopher 0, then the rest, and wait for every one of them
fn launch_table(args: &TableArgs, json: bool) -> TableResult<()> {
    let config = args.config();
    launch_all(
        |id| spawn_seat(args, json, id),
        || {
            let backend = kernel_backend()?;
            table::clear_leftovers(backend.as_ref(), &config)
        },
    )
}

/// Launch every seat through `spawn` and reap every child that started
///
/// A table missing a seat can never empty, so if any spawn fails the
/// children already running are killed and reaped, `clear` removes the
/// sets they created, and the spawn error is returned. Otherwise the
/// first child to fail is reported.
fn launch_all<S, C>(mut spawn: S, clear: C) -> TableResult<()>
where
    S: FnMut(PhilosopherId) -> TableResult<Child>,
    C: FnOnce() -> TableResult<usize>,
{
    let seats =
        std::iter::once(INITIALIZER).chain((0..NUM_PHILOSOPHERS).filter(|&id| id != INITIALIZER));

    let mut children = Vec::with_capacity(NUM_PHILOSOPHERS);
    let mut spawn_failure = None;
    for id in seats {
        match spawn(id) {
            Ok(child) => children.push((id, child)),
            Err(err) => {
                error!(philosopher = id, error = %err, "failed to launch philosopher");
                spawn_failure = Some(err);
                break;
            }
        }
    }

    if let Some(err) = spawn_failure {
        for (id, mut child) in children {
            if let Err(e) = child.kill() {
                debug!(philosopher = id, error = %e, "philosopher already exited");
            }
            if let Err(e) = child.wait() {
                warn!(philosopher = id, error = %e, "failed to reap philosopher");
            }
        }
        match clear() {
            Ok(removed) => info!(removed, "cleared sets of the aborted table"),
            Err(e) => warn!(error = %e, "failed to clear sets of the aborted table"),
        }
        return Err(err);
    }
    info!(count = children.len(), "philosophers launched");

    let mut first_failure = None;
    for (id, mut child) in children {
        let outcome = child.wait().map_err(|e| e.to_string()).and_then(|status| {
            if status.success() {
                Ok(())
            } else {
                Err(format!("exited with {}", status))
            }
        });
        if let Err(message) = outcome {
            error!(philosopher = id, %message, "philosopher failed");
            first_failure.get_or_insert(TableError::Launch {
                philosopher: id,
                message,
            });
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_seat_with_overrides() {
        let cli = Cli::try_parse_from([
            "philosopher",
            "--order",
            "uniform",
            "--pace",
            "quick",
            "seat",
            "3",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Seat { id: 3 }));
        let config = cli.table.config();
        assert_eq!(config.order, AcquisitionOrder::Uniform);
        assert_eq!(config, TableConfig::quick().order(AcquisitionOrder::Uniform));
    }

    #[test]
    fn test_forward_round_trips_through_parser() {
        let args = TableArgs {
            order: AcquisitionOrder::Uniform,
            pace: Pace::Instant,
            fork_key: 5001,
            count_key: 5002,
        };
        let mut argv = vec!["philosopher".to_string()];
        argv.extend(args.forward());
        argv.extend(["seat".to_string(), "1".to_string()]);

        let cli = Cli::try_parse_from(argv).unwrap();
        assert_eq!(cli.table.config(), args.config());
    }

    #[cfg(target_os = "linux")]
    fn shell(id: PhilosopherId, script: &str) -> TableResult<Child> {
        Command::new("sh")
            .args(["-c", script])
            .spawn()
            .map_err(|e| TableError::Launch {
                philosopher: id,
                message: e.to_string(),
            })
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_seat_fails_the_table() {
        let mut launched = Vec::new();
        let result = launch_all(
            |id| {
                launched.push(id);
                shell(id, if id == 2 { "exit 3" } else { "exit 0" })
            },
            || -> TableResult<usize> { panic!("sets are only cleared after a spawn failure") },
        );

        assert_eq!(launched, vec![0, 1, 2, 3, 4]);
        match result {
            Err(TableError::Launch {
                philosopher,
                message,
            }) => {
                assert_eq!(philosopher, 2);
                assert!(message.contains('3'), "{}", message);
            }
            other => panic!("expected launch error, got {:?}", other),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_spawn_failure_reaps_launched_seats() {
        let mut pids = Vec::new();
        let mut clears = 0;
        let result = launch_all(
            |id| {
                if id == 3 {
                    return Err(TableError::Launch {
                        philosopher: id,
                        message: "spawn refused".to_string(),
                    });
                }
                let child = shell(id, "sleep 30")?;
                pids.push(child.id());
                Ok(child)
            },
            || {
                clears += 1;
                Ok(2)
            },
        );

        assert!(matches!(
            result,
            Err(TableError::Launch { philosopher: 3, .. })
        ));
        assert_eq!(pids.len(), 3);
        assert_eq!(clears, 1);
        // reaped children leave no /proc entry, zombies would
        for pid in pids {
            assert!(
                !std::path::Path::new(&format!("/proc/{}", pid)).exists(),
                "child {} was not reaped",
                pid
            );
        }
    }

    #[test]
    fn test_simulate_runs_whole_table() {
        let reports = simulate(TableConfig::instant(), Some(7)).unwrap();
        assert_eq!(reports.len(), NUM_PHILOSOPHERS);
        assert!(reports.iter().all(|r| r.meals == 3));
        assert_eq!(reports.iter().filter(|r| r.tore_down).count(), 1);
    }
}
