//! `vega init [name]`: scaffold a new project directory.
//!
//! The source-language front-end that actually compiles `.vega` files to
//! bytecode is out of scope for this runtime (spec §1) — this writes only
//! the minimal skeleton a compiler would later consume, not a working
//! toolchain.

use std::path::Path;

use crate::error::CliError;

const STUB_SOURCE: &str = "agent assistant {\n    model: \"claude-3-5-sonnet-20241022\"\n    system: \"You are a helpful assistant.\"\n}\n\nfn main() {\n    send(assistant, \"Hello, Vega!\")\n}\n";

/// Create `name/main.vega` and `name/vega.toml`, or `main.vega`/`vega.toml`
/// in the current directory when `name` is `None`.
///
/// # Errors
///
/// [`CliError::Io`] if the directory or files can't be created, or
/// [`CliError::Usage`] if a project already exists at the target path.
pub fn run(name: Option<&str>) -> Result<(), CliError> {
    let dir = name.map(Path::new).unwrap_or_else(|| Path::new("."));
    if name.is_some() {
        std::fs::create_dir_all(dir)?;
    }

    let main_path = dir.join("main.vega");
    if main_path.exists() {
        return Err(CliError::Usage(format!("{} already exists", main_path.display())));
    }
    std::fs::write(&main_path, STUB_SOURCE)?;

    let project_name = name.unwrap_or("vega-project");
    std::fs::write(dir.join("vega.toml"), format!("[project]\nname = \"{project_name}\"\nentry = \"main.vega\"\n"))?;

    println!("created {}", main_path.display());
    Ok(())
}
