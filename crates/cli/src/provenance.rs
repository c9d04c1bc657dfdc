use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::ffi::OsString;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Metadata recorded next to generated figures.
pub struct Payload {
    pub params: Value,
    pub inputs: Vec<String>,
}

impl Payload {
    pub fn new(params: Value) -> Self {
        Self {
            params,
            inputs: Vec::new(),
        }
    }

    pub fn with_input<P: AsRef<Path>>(mut self, input: P) -> Self {
        self.inputs.push(input.as_ref().to_string_lossy().into_owned());
        self
    }
}

/// Write `<stem>.provenance.json` for a group of outputs sharing one stem
/// (e.g. the PNG/SVG/PDF of a figure): git commit, callsite, params, inputs,
/// outputs.
#[track_caller]
pub fn write_sidecar<P: AsRef<Path>>(outputs: &[P], payload: Payload) -> Result<PathBuf> {
    let first = outputs
        .first()
        .context("provenance sidecar needs at least one output")?
        .as_ref();
    let provenance_path = provenance_path(first);
    if let Some(parent) = provenance_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating provenance dir {}", parent.display()))?;
        }
    }

    let callsite = Location::caller();
    let doc = json!({
        "code_rev": current_git_rev(),
        "figkit_version": figkit::VERSION,
        "callsite": {
            "file": callsite.file(),
            "line": callsite.line()
        },
        "params": payload.params,
        "inputs": payload.inputs,
        "outputs": outputs
            .iter()
            .map(|p| p.as_ref().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
    });
    fs::write(&provenance_path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {}", provenance_path.display()))?;
    Ok(provenance_path)
}

fn provenance_path(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    let mut name = stem;
    name.push(".provenance.json");
    artifact.with_file_name(name)
}

pub fn current_git_rev() -> String {
    if let Some(from_env) = option_env!("GIT_COMMIT") {
        if !from_env.is_empty() {
            return from_env.to_string();
        }
    }
    if let Ok(env_override) = std::env::var("GIT_COMMIT") {
        if !env_override.is_empty() {
            return env_override;
        }
    }
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn provenance_path_drops_extension() {
        let base = Path::new("/tmp/figures/studies-over-time.pdf");
        let derived = provenance_path(base);
        assert_eq!(
            derived,
            Path::new("/tmp/figures/studies-over-time.provenance.json")
        );
    }

    #[test]
    fn sidecar_lists_every_output() {
        let dir = tempdir().unwrap();
        let outputs = [dir.path().join("fig.png"), dir.path().join("fig.pdf")];
        let payload = Payload::new(json!({"seed": 3})).with_input("refs.bib");
        let prov_path = write_sidecar(&outputs, payload).unwrap();
        assert_eq!(prov_path, dir.path().join("fig.provenance.json"));
        let parsed: Value = serde_json::from_slice(&fs::read(prov_path).unwrap()).unwrap();
        assert_eq!(parsed["outputs"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["outputs"][1], outputs[1].to_string_lossy().as_ref());
        assert_eq!(parsed["inputs"][0], "refs.bib");
        assert_eq!(parsed["params"]["seed"], 3);
    }

    #[test]
    fn sidecar_needs_an_output() {
        let empty: [PathBuf; 0] = [];
        assert!(write_sidecar(&empty, Payload::new(Value::Null)).is_err());
    }
}
