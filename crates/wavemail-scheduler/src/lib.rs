//! Wavemail Scheduler
//!
//! The sendability calculator: decides, per pending edit, the earliest time
//! it becomes safe to email, and per wavelet, the next moment any action is
//! due.
//!
//! # Scheduling policy
//!
//! Three independent timeout rules apply to every edit in automatic mode:
//!
//! - **submit lag**: after a submit, wait a short while before the edit is
//!   sendable (quick turnaround once everyone is done)
//! - **quiet period**: while someone is still editing, wait for a longer
//!   pause in changes
//! - **lifetime cap**: an edit continuously re-edited is sent anyway once
//!   its first edit is old enough, so nothing is held forever
//!
//! On top of that, a wavelet never sends two digests closer together than
//! the minimum send interval, bounding email volume per thread.
//!
//! In manual mode, an edit is sendable immediately after an explicit send
//! request (with no edit since), and never otherwise.
//!
//! # Usage
//!
//! ```
//! use wavemail_domain::{EditRecord, ParticipantId, SendMode, WaveletId, WaveletState};
//! use wavemail_scheduler::{Scheduler, SchedulerConfig};
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
//!
//! let mut wavelet = WaveletState::new(WaveletId::new("wave", "conv"));
//! let mut edit = EditRecord::new("b+1", ParticipantId::new("alice"), "hello");
//! scheduler.record_edit(&mut edit, 1_000, true, false);
//! wavelet.pending_edits.push(edit);
//!
//! scheduler.update_schedule(&mut wavelet);
//! assert!(wavelet.time_for_sending > 1_000);
//! ```

#![warn(missing_docs)]

mod calculator;
mod config;
mod error;
mod events;
mod recipients;

pub use calculator::Scheduler;
pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use events::{apply_event, WaveletEvent};
pub use recipients::interested_recipients;
