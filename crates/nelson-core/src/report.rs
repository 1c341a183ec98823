//! Terminal error reporting.
//!
//! Errors are collected root cause first while a command runs. They are
//! printed the other way round so the most actionable message is on top.

use std::fmt::Display;
use std::io::{self, Write};

/// Write `errors` to `out`, one per line, most recent first.
pub fn report<W: Write, E: Display>(out: &mut W, errors: &[E]) -> io::Result<()> {
    for err in errors.iter().rev() {
        writeln!(out, "{}", err)?;
    }
    Ok(())
}

/// `report` to stderr. Write failures are ignored; there is nowhere left to
/// send them.
pub fn report_to_stderr<E: Display>(errors: &[E]) {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    let _ = report(&mut handle, errors);
}
