//! Per-language setup that runs once before any scripted flow.
//!
//! Python installs the SDK with pip. JavaScript and TypeScript get a minimal
//! npm manifest in the `.okareo` directory; TypeScript is then compiled into
//! `.okareo/dist`.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::process::CommandSpec;
use crate::config::Language;
use crate::error::{Result, RunError};

const TSCONFIG_JSON: &str = r#"{
  "compilerOptions": {
    "module": "commonjs",
    "esModuleInterop": true,
    "target": "es6",
    "moduleResolution": "node",
    "sourceMap": true,
    "outDir": "dist"
  },
  "lib": ["es2015"]
}
"#;

const TS_PACKAGE_JSON: &str = r#"{
  "name": "ts-minimal-ci",
  "version": "0.0.1",
  "description": "Okareo TS Recipe",
  "main": "index.ts",
  "private": true,
  "devDependencies": {
    "@types/node": "^20.11.28",
    "okareo-ts-sdk": "latest",
    "typescript": "^5.4.2"
  },
  "scripts": {
    "build": "tsc"
  }
}
"#;

const JS_PACKAGE_JSON: &str = r#"{
  "name": "js-minimal-ci",
  "version": "0.0.1",
  "description": "Okareo JS Recipe",
  "private": true,
  "devDependencies": {
    "okareo-ts-sdk": "latest"
  }
}
"#;

/// Knobs for the setup steps
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapOptions {
    /// Install the SDK before running Python flows
    pub install_latest: bool,
    /// Pass `--upgrade` to pip
    pub upgrade: bool,
    /// Show installer output and stderr
    pub debug: bool,
}

/// Manifests written into `.okareo` when missing. Existing files are left alone.
pub fn manifests(language: &Language) -> &'static [(&'static str, &'static str)] {
    match language {
        Language::TypeScript => &[
            ("tsconfig.json", TSCONFIG_JSON),
            ("package.json", TS_PACKAGE_JSON),
        ],
        Language::JavaScript => &[("package.json", JS_PACKAGE_JSON)],
        _ => &[],
    }
}

pub fn ensure_manifests(language: &Language, okareo_dir: &Path) -> Result<()> {
    for (file_name, content) in manifests(language) {
        let path = okareo_dir.join(file_name);
        if path.exists() {
            continue;
        }
        debug!(path = %path.display(), "Writing manifest");
        fs::write(&path, content).map_err(|source| RunError::Io {
            path: path.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Commands to run, in order, to make `language` flows runnable
pub fn bootstrap_plan(
    language: &Language,
    okareo_dir: &Path,
    options: BootstrapOptions,
) -> Vec<CommandSpec> {
    let npm_install = || {
        CommandSpec::new("npm")
            .arg("install")
            .current_dir(okareo_dir)
            .echo_stdout(options.debug)
            .inherit_stderr(options.debug)
    };

    match language {
        Language::Python if options.install_latest => {
            let mut pip = CommandSpec::new("python3").arg("-m").arg("pip").arg("install");
            if options.upgrade {
                pip = pip.arg("--upgrade");
            }
            vec![pip
                .arg("okareo")
                .echo_stdout(options.debug)
                .inherit_stderr(options.debug)]
        }
        Language::JavaScript => vec![npm_install()],
        Language::TypeScript => vec![
            npm_install(),
            CommandSpec::new("npm")
                .arg("run")
                .arg("build")
                .current_dir(okareo_dir)
                .inherit_stderr(true),
        ],
        _ => Vec::new(),
    }
}
