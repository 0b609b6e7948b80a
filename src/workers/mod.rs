//! Clients for the remote testing workers
//!
//! The GUI worker is a plain HTTP endpoint; the API worker speaks WebSocket.

pub mod api;
pub mod gui;

pub use api::{ApiWorkerClient, ApiWorkerError};
pub use gui::GuiWorkerClient;
