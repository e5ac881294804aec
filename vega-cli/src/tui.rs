//! `vega tui [file.vgb]`: the interactive terminal front-end.
//!
//! The TUI itself — a REPL/observability surface built on the trace
//! bus's publish/subscribe seam — is an external collaborator out of
//! scope for this runtime (spec §1); this subcommand only validates that
//! its one required input loads, then reports that the interactive
//! surface lives outside this build.

use crate::error::CliError;

/// Validate `path` (if given) loads as a well-formed image, then report
/// that no interactive front-end is bundled with this runtime.
///
/// # Errors
///
/// [`CliError::Image`]/[`CliError::Io`] if `path` is given but doesn't
/// load.
pub fn run(path: Option<&str>) -> Result<(), CliError> {
    if let Some(path) = path {
        let bytes = std::fs::read(path)?;
        vega_bytecode::Image::load(&bytes)?;
    }
    println!("vega tui: no interactive front-end is bundled with this build; subscribe to the trace bus from an embedding program instead");
    Ok(())
}
