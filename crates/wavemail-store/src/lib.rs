//! Wavemail Store
//!
//! In-memory reference implementation of the persistence contract
//! (`wavemail_domain::traits::WaveletStore`).
//!
//! This is not a durability layer: it exists so the digest pipeline can be
//! run and tested end to end without a real datastore, and it implements
//! the same transactional shape a real backend must provide: `save` and
//! `record_provenance` stage changes that become visible only after
//! `commit`, and `rollback` discards everything staged since the last
//! commit. Transactions are scoped per wavelet-processing unit.

#![warn(missing_docs)]

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryWaveletStore;
