pub mod render;

pub use render::{post_report, render_json, render_table, render_yaml};
