//! RTC Utility - a single-threaded scheduler for periodic modules.
//!
//! A [`ProcessThread`] owns one worker thread and drives any number of
//! [`Module`]s on it. Each module is asked how long it wants to sleep
//! ([`Module::time_until_next_process`]), and is called back
//! ([`Module::process`]) once that time has elapsed. Modules never run
//! concurrently with each other or with themselves.
//!
//! ```ignore
//! use rtc_utility::{Module, ProcessThread};
//! use std::sync::Arc;
//!
//! let process_thread = ProcessThread::new("worker")?;
//! let id = process_thread.register_module(Arc::new(MyModule::default()));
//! process_thread.start();
//!
//! // Ask the worker to process the module right away.
//! process_thread.wake_up(id);
//!
//! process_thread.stop();
//! ```
//!
//! Registration, deregistration and wake-ups may be issued from any thread.
//! `start` and `stop` belong to the thread owning the `ProcessThread`.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

mod module;
mod process_thread;
mod task_queue;

pub use module::{Module, ModuleId};
pub use process_thread::{ProcessThread, ProcessThreadHandle};
