pub mod display_names;
pub mod download_queue;
pub mod session_controller;

#[cfg(test)]
pub mod fakes;

pub use session_controller::SessionController;
