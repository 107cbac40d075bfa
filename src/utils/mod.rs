//! Small helpers shared across the build and runtime sides.

pub mod exec;
pub mod hash;
pub mod path;

pub use plural::plural_count;

mod plural {
    /// `plural_count(3, "view")` -> `"3 views"`
    pub fn plural_count(count: usize, noun: &str) -> String {
        let s = if count == 1 { "" } else { "s" };
        format!("{count} {noun}{s}")
    }

}
