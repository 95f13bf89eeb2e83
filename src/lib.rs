//! Daemon and cli for tracking how much time is spent on each website. A browser extension reports
//! tab and focus changes to the daemon over HTTP, the daemon turns them into minutes per site and
//! keeps them in a local file or a remote store.

pub mod classifier;
pub mod cli;
pub mod daemon;
pub mod fs;
pub mod tracker;
pub mod utils;
