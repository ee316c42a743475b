//! Fuzz target replaying an opaque byte buffer as a simulation schedule.
//!
//! Every input is a valid schedule: draws consume bytes until the buffer is
//! exhausted, which ends the run cleanly. The only crash is the workload
//! invariant aborting, so any artifact this target produces is a recorded
//! interleaving that breaks the service.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_replay_simulation
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = tidepool::run_replay(data);
});
