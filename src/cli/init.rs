// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Init command - write the built-in taskfile

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::template::DEFAULT_TEMPLATE;
use crate::utils::{print_status, Status};

/// Source directories the built-in taskfile reads from
const SOURCE_DIRS: &[&str] = &["src/scss", "src/js", "src/img/icons", "src/misc"];

/// Run the init command
pub async fn run(
    taskfile_path: PathBuf,
    name: Option<String>,
    force: bool,
    verbose: bool,
) -> Result<()> {
    let project_name = name.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "site".to_string())
    });

    println!("{}", "Initializing assetflow project...".bold());
    println!();

    if taskfile_path.exists() && !force {
        return Err(miette::miette!(
            help = "Pass --force to overwrite it",
            "{} already exists",
            taskfile_path.display()
        ));
    }

    let content = render_template(&project_name);
    std::fs::write(&taskfile_path, &content).map_err(|e| {
        miette::miette!("Failed to write {}: {}", taskfile_path.display(), e)
    })?;

    print_status(Status::Done, format!("Created {}", taskfile_path.display()));

    let root = super::project_root(&taskfile_path)?;
    for dir in SOURCE_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| {
                miette::miette!("Failed to create directory '{}': {}", dir, e)
            })?;
            print_status(Status::Done, format!("Created {}/", dir));
        }
    }

    println!();
    println!("{}", "Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Put pages in {} and styles in {}", "src/".cyan(), "src/scss/".cyan());
    println!("  2. Run {} to build once", "assetflow run build".cyan());
    println!("  3. Run {} to build and serve with live reload", "assetflow run".cyan());
    println!();

    if verbose {
        println!("{}", "Generated taskfile:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

/// The built-in template with the project name filled in
fn render_template(name: &str) -> String {
    let name = name.replace(['"', '\\'], "");
    DEFAULT_TEMPLATE.replacen("name: site", &format!("name: \"{}\"", name), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Taskfile;

    #[test]
    fn test_render_template_sets_name() {
        let taskfile = Taskfile::from_yaml(&render_template("my \"blog\"")).unwrap();
        assert_eq!(taskfile.name, "my blog");
        assert_eq!(taskfile.tasks.len(), 11);
    }
}
