pub mod countdown;
pub mod icons;

pub use countdown::{CountdownView, countdown_line, dispatch_lines};
