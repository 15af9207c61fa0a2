pub mod tracked_num_traits;
pub mod tracked_ops;
