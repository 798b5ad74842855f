//! Utilities shared by the Agora server binary, its library and its tests.

pub mod logger;
pub mod time;
