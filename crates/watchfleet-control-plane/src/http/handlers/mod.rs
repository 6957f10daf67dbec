//! HTTP request handlers.

mod devices;
mod health;
mod patterns;
mod scheduler;
mod status;
mod tasks;
mod videos;

pub use devices::{
    device_heartbeat, disconnect_device, list_devices, recover_device, register_device,
    remove_device, report_fault,
};
pub use health::{health_check, metrics_handler};
pub use patterns::{
    double_tap, generate_pattern, interaction_pattern, interaction_rates, long_press, scroll,
    seek, shorts_timing, swipe, tap, tap_sequence, typing, watch_distribution, watch_pattern,
};
pub use scheduler::{start_scheduler, stop_scheduler};
pub use status::get_status;
pub use tasks::{cancel_task, list_tasks};
pub use videos::{enqueue_video, video_progress};
