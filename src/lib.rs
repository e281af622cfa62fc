//! # Slipstream
//!
//! A GPU-resident particle tunnel game: fly forward through an infinite
//! procedural tunnel, steer with the mouse to stay near the path ribbon,
//! dodge the obstacle figures, and reach the goal region before your
//! energy runs out.
//!
//! The engine keeps every particle on the GPU. Each system is double
//! buffered: a compute kernel reads last frame's state and writes this
//! frame's, the renderer draws the fresh buffer as additive point sprites,
//! and the roles swap once per frame. Collision detection reuses the same
//! kernel in a probe mode against a 64-slot buffer, read back synchronously
//! and reduced to a minimum distance on the CPU.
//!
//! ## Layout
//!
//! - [`math`] - matrix helpers and frame-rate-independent damping
//! - [`gpu`] - device/surface plumbing and the shared pipelines
//! - [`particles`] - particle systems, WGSL kernels, proximity queries
//! - [`game`] - fades, the state integrator and the frame director
//! - [`app`] - winit shell
//!
//! ## Running
//!
//! ```ignore
//! slipstream::app::run(slipstream::config::GameConfig::default())?;
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod game;
pub mod gpu;
pub mod math;
pub mod particles;

pub use config::GameConfig;
pub use error::AppError;
