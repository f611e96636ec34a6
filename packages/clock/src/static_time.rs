//! The time the application started, used as the stopped clock's default
//! outside of tests.
use std::time::SystemTime;

lazy_static! {
    pub static ref TIME_AT_APP_START: SystemTime = SystemTime::now();
}
