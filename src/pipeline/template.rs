// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Built-in taskfile written by `assetflow init`

use crate::errors::AssetflowResult;
use crate::pipeline::Taskfile;

/// Taskfile for the conventional `src/` → `build/` site layout
pub const DEFAULT_TEMPLATE: &str = r#"# assetflow taskfile
version: "1"
name: site
description: Static site assets built from src/ into build/

tasks:
  - name: clean
    description: Remove the build directory
    kind: clean
    paths: [build]

  - name: html
    description: Inject partials and tidy HTML pages
    kind: pipeline
    src: src/*.html
    steps:
      - type: partials
        remove_tags: true
      - type: tidy
        max_preserve_newlines: 10
        end_with_newline: false
      - type: dest
        dir: build

  - name: styles
    description: Compile, prefix and minify the stylesheet
    kind: pipeline
    src: src/scss/styles.scss
    steps:
      - type: sass
      - type: autoprefix
      - type: dest
        dir: build/css
      - type: minify_css
      - type: rename
        name: styles.min.css
      - type: dest
        dir: build/css

  - name: scripts
    description: Bundle and minify JavaScript
    kind: pipeline
    src: src/js/**/*.js
    steps:
      - type: bundle
        entry: src/js/main.js
        filename: bundle.js
        target: es2015
      - type: dest
        dir: build/js
      - type: rename
        name: bundle.min.js
      - type: minify_js
      - type: dest
        dir: build/js

  - name: images
    description: Optimize images that changed since the last build
    kind: pipeline
    src: src/img/**/*
    steps:
      - type: newer
        dest: build/img
      - type: optimize_images
        png_compression: best
      - type: dest
        dir: build/img

  - name: webp
    description: WebP copies of raster images
    kind: pipeline
    src: src/img/**/*.{png,jpg,jpeg}
    steps:
      - type: webp
      - type: dest
        dir: build/img

  - name: miscellaneous
    description: Copy miscellaneous files
    kind: pipeline
    src: src/misc/**/*
    steps:
      - type: newer
        dest: build/misc
      - type: dest
        dir: build/misc

  - name: sprite
    description: Combine icons into an SVG sprite
    kind: pipeline
    src: src/img/icons/*.svg
    steps:
      - type: svgmin
      - type: rename
        prefix: icon-
      - type: svgstore
        filename: sprite.svg
      - type: dest
        dir: build/img

  - name: serve
    description: Serve build/ with live reload and rebuild on change
    kind: serve

  - name: build
    kind: series
    tasks:
      - clean
      - html
      - images
      - parallel: [miscellaneous, styles, scripts, sprite, webp]

  - name: default
    kind: series
    tasks: [build, serve]

watch:
  debounce_ms: 200
  ignore: [build]
  rules:
    - { pattern: "src/**/*.html", task: html }
    - { pattern: "src/scss/**/*.scss", task: styles }
    - { pattern: "src/js/main.js", task: scripts }
    - { pattern: "src/img/**/*", task: images }
    - { pattern: "src/misc/**/*", task: miscellaneous }
    - { pattern: "src/img/icons/**/*.svg", task: sprite }
    - { pattern: "src/img/**/*.{png,jpg,jpeg}", task: webp }

server:
  root: build
  host: 127.0.0.1
  port: 4000
  live_reload: true

bundler:
  command: esbuild
"#;

/// Parse the built-in template
pub fn default_taskfile() -> AssetflowResult<Taskfile> {
    Taskfile::from_yaml(DEFAULT_TEMPLATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TaskKind;

    #[test]
    fn test_template_registers_every_task() {
        let taskfile = default_taskfile().unwrap();
        assert_eq!(
            taskfile.task_names(),
            vec![
                "clean",
                "html",
                "styles",
                "scripts",
                "images",
                "webp",
                "miscellaneous",
                "sprite",
                "serve",
                "build",
                "default"
            ]
        );
    }

    #[test]
    fn test_template_step_order() {
        let taskfile = default_taskfile().unwrap();
        let TaskKind::Pipeline { steps, .. } = &taskfile.get_task("styles").unwrap().kind else {
            panic!("styles should be a pipeline");
        };
        let names: Vec<_> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["sass", "autoprefix", "dest", "minify_css", "rename", "dest"]
        );
    }

    #[test]
    fn test_template_watch_rules() {
        let taskfile = default_taskfile().unwrap();
        assert_eq!(taskfile.watch.rules.len(), 7);
        assert!(taskfile
            .watch
            .rules
            .iter()
            .all(|rule| taskfile.get_task(&rule.task).is_some()));
    }
}
