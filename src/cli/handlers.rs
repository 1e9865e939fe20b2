// FILE: src/cli/handlers.rs
use crate::{compile_file, config::StylableConfig, CompilerError, Result};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Compile the input file; returns whether it compiled without errors.
pub fn handle_compile_command(config: &StylableConfig, matches: &clap::ArgMatches) -> Result<bool> {
    let Some(input_path) = matches.get_one::<String>("input") else {
        return Err(CompilerError::InvalidFormat {
            message: "missing input file".to_string(),
        });
    };
    let output_path = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(Path::new(input_path)));

    log::info!("Compiling {} -> {}", input_path, output_path.display());
    let compile_start = Instant::now();
    let result = compile_file(input_path, config.clone())?;

    for diagnostic in &result.diagnostics.reports {
        eprintln!("{}", diagnostic);
    }

    fs::write(&output_path, result.ast.to_string())?;
    log::info!(
        "Wrote {} in {:.2}ms",
        output_path.display(),
        compile_start.elapsed().as_secs_f64() * 1000.0
    );

    if let Some(exports_path) = matches.get_one::<String>("exports") {
        let json = serde_json::to_string_pretty(&result.exports).map_err(|e| CompilerError::InvalidFormat {
            message: format!("cannot serialize exports: {}", e),
        })?;
        fs::write(exports_path, json)?;
        log::info!("Wrote exports to {}", exports_path);
    }

    Ok(!result.diagnostics.has_errors())
}

/// `button.st.css` compiles to `button.css` next to it, `theme.css` to `theme.scoped.css`
fn default_output_path(input: &Path) -> PathBuf {
    let file_name = input.file_name().and_then(|n| n.to_str()).unwrap_or("style");
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let output = input.with_file_name(format!("{}.css", stem));
    if output == input {
        input.with_file_name(format!("{}.scoped.css", stem))
    } else {
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/src/button.st.css")),
            PathBuf::from("/src/button.css")
        );
        assert_eq!(default_output_path(Path::new("theme.css")), PathBuf::from("theme.scoped.css"));
    }
}
