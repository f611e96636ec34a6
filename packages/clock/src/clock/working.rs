use std::time::SystemTime;

use depot_tracker_primitives::DurationSinceUnixEpoch;

use crate::clock;

pub struct WorkingClock;

impl clock::Time for clock::Working {
    fn now() -> DurationSinceUnixEpoch {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("the system time should be after the unix epoch")
    }
}
