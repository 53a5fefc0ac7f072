pub mod cancel;
pub mod constants;
pub mod filename;
pub mod logging;
pub mod progress;

pub use cancel::{CancelFlag, Interrupt};
pub use constants::*;
pub use filename::{parse_part_sequence, part_file_name, temp_part_file_name};
pub use logging::init_logging;
pub use progress::ProgressReporter;
