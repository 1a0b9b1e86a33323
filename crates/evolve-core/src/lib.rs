//! Simulation clock, task model, and tick loop for the Evolve simulation.
//!
//! This crate owns the per-tick cycle that drives the board: clock advance,
//! board recomputation, priority-ordered task dispatch, frame-end tasks,
//! and end-of-tick cleanup.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and simulated milliseconds.
//! - [`config`] -- Configuration loading from `evolve-config.yaml` into
//!   strongly-typed structs.
//! - [`runner`] -- Bounded async loop around the scheduler with a
//!   per-tick [`TickCallback`] for rendering and export.
//! - [`scheduler`] -- [`Scheduler`]: the tick cycle.
//! - [`task`] -- [`Task`], its dispatch categories, and the priority
//!   registry.
//!
//! [`TickCallback`]: runner::TickCallback
//! [`Scheduler`]: scheduler::Scheduler
//! [`Task`]: task::Task

pub mod clock;
pub mod config;
pub mod runner;
pub mod scheduler;
pub mod task;
