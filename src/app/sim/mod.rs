mod engine;
mod quadtree;

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::error;

pub(in crate::app) use engine::{BodySeed, LayoutOptions, LinkSpec, SimPoint, SimulationEngine};

const TICK_INTERVAL: Duration = Duration::from_millis(16);

pub(in crate::app) enum SimulationCommand {
    Start {
        nodes: Vec<BodySeed>,
        edges: Vec<LinkSpec>,
        width: f32,
        height: f32,
        options: LayoutOptions,
    },
    Restart {
        alpha: f32,
    },
    Stop,
}

pub(in crate::app) enum SimulationEvent {
    Tick { bodies: Vec<SimPoint> },
    End { bodies: Vec<SimPoint> },
    Error { message: String },
}

/// Handle to the layout worker thread. All communication is message passing;
/// the worker owns the engine state and the render side only ever sees whole
/// tick snapshots.
pub(in crate::app) struct SimulationHandle {
    commands: Sender<SimulationCommand>,
    events: Receiver<SimulationEvent>,
    worker: Option<JoinHandle<()>>,
}

impl SimulationHandle {
    pub(in crate::app) fn spawn() -> Self {
        Self::spawn_with_interval(TICK_INTERVAL)
    }

    fn spawn_with_interval(tick_interval: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("layout-sim".to_owned())
            .spawn(move || worker_loop(command_rx, event_tx, tick_interval))
            .ok();
        if worker.is_none() {
            error!("failed to spawn layout worker thread");
        }

        Self {
            commands: command_tx,
            events: event_rx,
            worker,
        }
    }

    pub(in crate::app) fn start(
        &self,
        nodes: Vec<BodySeed>,
        edges: Vec<LinkSpec>,
        width: f32,
        height: f32,
        options: LayoutOptions,
    ) {
        let _ = self.commands.send(SimulationCommand::Start {
            nodes,
            edges,
            width,
            height,
            options,
        });
    }

    pub(in crate::app) fn restart(&self, alpha: f32) {
        let _ = self.commands.send(SimulationCommand::Restart { alpha });
    }

    pub(in crate::app) fn stop(&self) {
        let _ = self.commands.send(SimulationCommand::Stop);
    }

    pub(in crate::app) fn drain(&self) -> impl Iterator<Item = SimulationEvent> + '_ {
        self.events.try_iter()
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(SimulationCommand::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    commands: Receiver<SimulationCommand>,
    events: Sender<SimulationEvent>,
    tick_interval: Duration,
) {
    let mut engine: Option<SimulationEngine> = None;
    let mut running = false;

    loop {
        let command = if running {
            match commands.recv_timeout(tick_interval) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            }
        };

        match command {
            Some(SimulationCommand::Stop) => return,
            Some(SimulationCommand::Start {
                nodes,
                edges,
                width,
                height,
                options,
            }) => {
                engine = Some(SimulationEngine::new(nodes, edges, width, height, options));
                running = true;
                continue;
            }
            Some(SimulationCommand::Restart { alpha }) => {
                if let Some(active) = engine.as_mut() {
                    active.restart(alpha);
                    running = true;
                }
                continue;
            }
            None => {}
        }

        let Some(active) = engine.as_mut() else {
            continue;
        };

        // a tick failure must not take the app down with it; it surfaces as
        // a discrete error event and the worker goes idle
        match panic::catch_unwind(AssertUnwindSafe(|| active.tick())) {
            Ok(true) => {
                let _ = events.send(SimulationEvent::Tick {
                    bodies: active.snapshot(),
                });
            }
            Ok(false) => {
                let _ = events.send(SimulationEvent::End {
                    bodies: active.snapshot(),
                });
                running = false;
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("layout worker tick failed: {message}");
                let _ = events.send(SimulationEvent::Error { message });
                engine = None;
                running = false;
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "layout tick panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn demo_seeds(count: usize) -> Vec<BodySeed> {
        (0..count)
            .map(|index| BodySeed {
                id: format!("n{index}"),
                pos: None,
                mass: 1.0,
                radius: 4.0,
            })
            .collect()
    }

    fn collect_until_end(handle: &SimulationHandle) -> (usize, Vec<SimPoint>) {
        let deadline = Instant::now() + Duration::from_secs(20);
        let mut ticks = 0usize;
        loop {
            assert!(Instant::now() < deadline, "worker never emitted End");
            match handle.events.recv_timeout(Duration::from_secs(5)) {
                Ok(SimulationEvent::Tick { .. }) => ticks += 1,
                Ok(SimulationEvent::End { bodies }) => return (ticks, bodies),
                Ok(SimulationEvent::Error { message }) => panic!("worker error: {message}"),
                Err(error) => panic!("worker went silent: {error}"),
            }
        }
    }

    #[test]
    fn start_runs_to_end_with_bounded_tick_count() {
        let handle = SimulationHandle::spawn_with_interval(Duration::ZERO);
        handle.start(
            demo_seeds(6),
            vec![LinkSpec {
                source: 0,
                target: 1,
                weight: 1.0,
            }],
            400.0,
            300.0,
            LayoutOptions::default(),
        );

        let (ticks, bodies) = collect_until_end(&handle);
        assert!((225..=235).contains(&(ticks + 1)), "got {ticks} ticks");
        assert_eq!(bodies.len(), 6);
        for body in &bodies {
            assert!((0.0..=400.0).contains(&body.pos.x));
            assert!((0.0..=300.0).contains(&body.pos.y));
        }
    }

    #[test]
    fn restart_resumes_ticking_after_end() {
        let handle = SimulationHandle::spawn_with_interval(Duration::ZERO);
        handle.start(
            demo_seeds(4),
            Vec::new(),
            200.0,
            200.0,
            LayoutOptions::default(),
        );
        let (first_ticks, _) = collect_until_end(&handle);
        assert!(first_ticks > 0);

        handle.restart(0.5);
        let (second_ticks, _) = collect_until_end(&handle);
        assert!(second_ticks > 0);
        assert!(second_ticks < first_ticks, "lower alpha settles sooner");
    }

    #[test]
    fn stop_halts_the_worker() {
        let handle = SimulationHandle::spawn_with_interval(Duration::ZERO);
        handle.start(
            demo_seeds(3),
            Vec::new(),
            100.0,
            100.0,
            LayoutOptions::default(),
        );
        handle.stop();

        // the worker drains its event sender when it exits; the channel must
        // disconnect rather than keep ticking forever
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match handle.events.recv_timeout(Duration::from_millis(200)) {
                Ok(_) => {
                    assert!(Instant::now() < deadline, "worker kept ticking after Stop");
                }
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    assert!(Instant::now() < deadline, "worker neither ticked nor exited");
                }
            }
        }
    }
}
