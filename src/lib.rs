pub mod config;
pub mod layout;
pub mod style;

// Scroll-driven components
pub mod scroll_signal;
pub mod smoother;
pub mod looping_track;
pub mod parallax;
pub mod progress;
pub mod reveal;

// Scheduling and page binding
pub mod driver;
pub mod effects;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
