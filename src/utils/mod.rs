//! Utility helpers shared by the installer and the orchestrator.

pub mod fs;

pub use fs::{copy_dir, move_dir, remove_dir_best_effort, remove_path};
