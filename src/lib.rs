//! Subtrans - Subtitle Translation Client
//! 
//! Submits a subtitle file and an API key to a remote translation service
//! and hands back the translated file, driven by an explicit session state machine.

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod intake;
pub mod interactive;
pub mod result;
pub mod service;
pub mod session;
pub mod workflow;
