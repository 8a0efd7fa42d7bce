//! Async simulation session
//!
//! One tokio task owns a [`Simulation`] and ticks it on a fixed interval.
//! Rider input and telemetry travel over `watch` channels (latest value
//! wins); tuning requests are queued on an `mpsc` channel and answered over
//! `oneshot` channels between ticks.

use std::ops::RangeInclusive;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::{ControlInput, Simulation, Telemetry};
use crate::calibration::{CalibrationMap, CellSnap, MapType};
use crate::config::SimulatorConfig;
use crate::datalog::TelemetryLogger;
use crate::ecu::{EcuSettings, EcuStatistics, TuningPreset};
use crate::engine::Environment;
use crate::error::{Error, Result};

/// Pending tuning requests before senders wait
const COMMAND_QUEUE_DEPTH: usize = 32;

enum SessionCommand {
    SetMapCell {
        map_type: MapType,
        rpm: f64,
        load: f64,
        value: f64,
        reply: oneshot::Sender<CellSnap>,
    },
    ModifyMapRegion {
        map_type: MapType,
        rpm_range: RangeInclusive<f64>,
        load_range: RangeInclusive<f64>,
        pct: f64,
        reply: oneshot::Sender<usize>,
    },
    ApplySettings {
        settings: EcuSettings,
        reply: oneshot::Sender<()>,
    },
    ApplyPreset {
        preset: &'static TuningPreset,
        reply: oneshot::Sender<()>,
    },
    SetEnvironment {
        environment: Environment,
        reply: oneshot::Sender<()>,
    },
    ReadCalibration {
        reply: oneshot::Sender<[CalibrationMap; 3]>,
    },
    Statistics {
        reply: oneshot::Sender<EcuStatistics>,
    },
    TelemetryLog {
        reply: oneshot::Sender<Option<TelemetryLogger>>,
    },
}

/// The task side of a running session
pub struct Session {
    simulation: Simulation,
    input: watch::Receiver<ControlInput>,
    telemetry: watch::Sender<Telemetry>,
    commands: mpsc::Receiver<SessionCommand>,
    cancel: CancellationToken,
}

impl Session {
    /// Build a simulation from a configuration and start it
    pub fn spawn_from_config(config: &SimulatorConfig) -> Result<SessionHandle> {
        Ok(Self::spawn(Simulation::from_config(config)?))
    }

    /// Start ticking a simulation on the current tokio runtime
    pub fn spawn(simulation: Simulation) -> SessionHandle {
        let id = Uuid::new_v4();
        let (input_tx, input_rx) = watch::channel(ControlInput::default());
        let (telemetry_tx, telemetry_rx) = watch::channel(Telemetry::default());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let cancel = CancellationToken::new();

        let session = Session {
            simulation,
            input: input_rx,
            telemetry: telemetry_tx,
            commands: command_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(session.run().instrument(tracing::info_span!("session", id = %id)));

        SessionHandle {
            id,
            input: input_tx,
            telemetry: telemetry_rx,
            commands: command_tx,
            cancel,
            task,
        }
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.simulation.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            tick_ms = self.simulation.tick_interval().as_millis() as u64,
            "session started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("session cancelled");
                    break;
                }
                Some(command) = self.commands.recv() => {
                    self.handle_command(command);
                }
                _ = ticker.tick() => {
                    let input = match self.input.has_changed() {
                        Ok(true) => Some(*self.input.borrow_and_update()),
                        Ok(false) => None,
                        Err(_) => {
                            tracing::info!("input channel closed");
                            break;
                        }
                    };
                    let telemetry = self.simulation.tick(input);
                    self.telemetry.send_replace(telemetry);
                }
            }
        }

        tracing::info!(ticks = self.simulation.ticks(), "session stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        // A dropped reply receiver means the caller gave up; the change still applies.
        match command {
            SessionCommand::SetMapCell {
                map_type,
                rpm,
                load,
                value,
                reply,
            } => {
                let _ = reply.send(self.simulation.set_map_cell(map_type, rpm, load, value));
            }
            SessionCommand::ModifyMapRegion {
                map_type,
                rpm_range,
                load_range,
                pct,
                reply,
            } => {
                let touched = self
                    .simulation
                    .modify_map_region(map_type, rpm_range, load_range, pct);
                let _ = reply.send(touched);
            }
            SessionCommand::ApplySettings { settings, reply } => {
                self.simulation.apply_settings(settings);
                let _ = reply.send(());
            }
            SessionCommand::ApplyPreset { preset, reply } => {
                self.simulation.apply_preset(preset);
                let _ = reply.send(());
            }
            SessionCommand::SetEnvironment { environment, reply } => {
                self.simulation.set_environment(environment);
                let _ = reply.send(());
            }
            SessionCommand::ReadCalibration { reply } => {
                let _ = reply.send(self.simulation.calibration());
            }
            SessionCommand::Statistics { reply } => {
                let _ = reply.send(self.simulation.statistics().clone());
            }
            SessionCommand::TelemetryLog { reply } => {
                let _ = reply.send(self.simulation.logger().cloned());
            }
        }
    }
}

/// Caller side of a running session
pub struct SessionHandle {
    id: Uuid,
    input: watch::Sender<ControlInput>,
    telemetry: watch::Receiver<Telemetry>,
    commands: mpsc::Sender<SessionCommand>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Session id used in log spans
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Replace the rider input; applied at the next tick
    pub fn send_input(&self, input: ControlInput) -> Result<()> {
        self.input.send(input).map_err(|_| Error::SessionClosed)
    }

    /// Most recent telemetry frame
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry.borrow().clone()
    }

    /// Receiver notified on every published frame
    pub fn subscribe(&self) -> watch::Receiver<Telemetry> {
        self.telemetry.clone()
    }

    /// Token that stops the session when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the session task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| Error::SessionClosed)?;
        rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Tune one map cell; returns where the write landed
    pub async fn set_map_cell(
        &self,
        map_type: MapType,
        rpm: f64,
        load: f64,
        value: f64,
    ) -> Result<CellSnap> {
        self.request(|reply| SessionCommand::SetMapCell {
            map_type,
            rpm,
            load,
            value,
            reply,
        })
        .await
    }

    /// Scale a region of one map; returns the number of cells changed
    pub async fn modify_map_region(
        &self,
        map_type: MapType,
        rpm_range: RangeInclusive<f64>,
        load_range: RangeInclusive<f64>,
        pct: f64,
    ) -> Result<usize> {
        self.request(|reply| SessionCommand::ModifyMapRegion {
            map_type,
            rpm_range,
            load_range,
            pct,
            reply,
        })
        .await
    }

    /// Replace the ECU settings
    pub async fn apply_settings(&self, settings: EcuSettings) -> Result<()> {
        self.request(|reply| SessionCommand::ApplySettings { settings, reply })
            .await
    }

    /// Apply the trims of a tuning preset
    pub async fn apply_preset(&self, preset: &'static TuningPreset) -> Result<()> {
        self.request(|reply| SessionCommand::ApplyPreset { preset, reply })
            .await
    }

    /// Replace the operating environment
    pub async fn set_environment(&self, environment: Environment) -> Result<()> {
        self.request(|reply| SessionCommand::SetEnvironment { environment, reply })
            .await
    }

    /// The three calibration maps as currently tuned
    pub async fn read_calibration(&self) -> Result<[CalibrationMap; 3]> {
        self.request(|reply| SessionCommand::ReadCalibration { reply })
            .await
    }

    /// Copy of the ECU statistics
    pub async fn statistics(&self) -> Result<EcuStatistics> {
        self.request(|reply| SessionCommand::Statistics { reply })
            .await
    }

    /// Copy of the session recorder, if recording is enabled
    pub async fn telemetry_log(&self) -> Result<Option<TelemetryLogger>> {
        self.request(|reply| SessionCommand::TelemetryLog { reply })
            .await
    }

    /// Stop the loop and wait for the task to finish
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.task.await.map_err(|_| Error::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> SimulatorConfig {
        SimulatorConfig {
            seed: Some(11),
            ..SimulatorConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_ticks_and_publishes() {
        let handle = Session::spawn_from_config(&config()).unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let stats = handle.statistics().await.unwrap();
        assert!((19..=22).contains(&stats.ticks_processed), "got {}", stats.ticks_processed);
        assert!((handle.telemetry().rpm - 900.0).abs() <= 10.0);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_reaches_engine() {
        let handle = Session::spawn_from_config(&config()).unwrap();
        handle.send_input(ControlInput::new(60.0, 1.0, 0)).unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;

        let telemetry = handle.telemetry();
        assert_eq!(telemetry.throttle_position, 60.0);
        assert!(telemetry.rpm > 1200.0, "got {}", telemetry.rpm);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_input_wins_between_ticks() {
        let handle = Session::spawn_from_config(&config()).unwrap();
        let mut telemetry = handle.subscribe();
        telemetry.changed().await.unwrap();

        handle.send_input(ControlInput::new(20.0, 1.0, 0)).unwrap();
        handle.send_input(ControlInput::new(45.0, 0.8, 1)).unwrap();
        handle.send_input(ControlInput::new(70.0, 1.0, 0)).unwrap();
        telemetry.changed().await.unwrap();

        let frame = telemetry.borrow_and_update().clone();
        assert_eq!(frame.throttle_position, 70.0);
        assert_eq!(frame.clutch_position, 1.0);
        assert_eq!(frame.gear, 0);

        let stats = handle.statistics().await.unwrap();
        assert_eq!(stats.ticks_processed, 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tuning_between_ticks() {
        let handle = Session::spawn_from_config(&config()).unwrap();

        let snap = handle
            .set_map_cell(MapType::Ignition, 5200.0, 47.0, 30.0)
            .await
            .unwrap();
        assert_eq!((snap.rpm_breakpoint, snap.load_breakpoint), (5000.0, 50.0));

        let maps = handle.read_calibration().await.unwrap();
        assert_eq!(maps[1].values[snap.rpm_index][snap.load_index], 30.0);

        handle
            .apply_preset(TuningPreset::by_name("Economy").unwrap())
            .await
            .unwrap();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_session_rejects_requests() {
        let handle = Session::spawn_from_config(&config()).unwrap();
        handle.cancellation_token().cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished());
        assert!(matches!(handle.statistics().await, Err(Error::SessionClosed)));
        assert!(matches!(
            handle.send_input(ControlInput::default()),
            Err(Error::SessionClosed)
        ));
    }
}
