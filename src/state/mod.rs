/// State management module
///
/// This module handles all application state, including:
/// - The local key-value store (store.rs)
/// - Shared data structures (data.rs)
/// - The diagnostic log (logs.rs)
/// - The generation session and its history (session.rs)

pub mod data;
pub mod logs;
pub mod session;
pub mod store;
