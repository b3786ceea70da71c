//! Skillsmith CLI library - command implementations and utilities.
//!
//! This crate provides the non-interactive command surface from spec §6.4.
//! The binary (`skillsmith`) is a thin wrapper around this library.

pub mod commands;
pub mod output;
pub mod stores;
