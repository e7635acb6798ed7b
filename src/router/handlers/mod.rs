mod logs;
mod tokens;

pub use logs::{get_logs, post_logs};
pub use tokens::{add_token, remove_token};
