//! Status lines printed around `rapi listen` and `rapi send`
//!
//! Decoded notifications themselves go to stdout undecorated so they can be
//! piped; these markers only frame them.

use colored::Colorize;

/// Request delivered, or a listen session summary.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Where the listener is bound.
pub fn info(msg: &str) {
    println!("{} {}", "•".blue(), msg);
}

/// The listen window closed without traffic.
pub fn warning(msg: &str) {
    println!("{} {}", "!".yellow(), msg);
}
