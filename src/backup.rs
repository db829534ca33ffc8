use crate::store::{LocalStore, ATTENDANCE_KEY, SETTINGS_KEY, STUDENTS_KEY};
use anyhow::{anyhow, Context};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const META_WORKSPACE_ENTRY: &str = "meta/workspace.json";
pub const BUNDLE_FORMAT_V1: &str = "kehadiran-workspace-v1";

const BUNDLED_KEYS: [&str; 3] = [STUDENTS_KEY, ATTENDANCE_KEY, SETTINGS_KEY];

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub installed_keys: Vec<String>,
}

fn data_entry(key: &str) -> String {
    format!("data/{key}.json")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write as _;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Zips the workspace's key documents plus a manifest carrying per-entry
/// SHA-256 checksums. Keys without a document are simply absent from the
/// bundle (a fresh workspace may hold settings only).
pub fn export_workspace_bundle(
    store: &LocalStore,
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let mut documents: Vec<(String, String)> = Vec::new();
    for key in BUNDLED_KEYS {
        if let Some(text) = store.get(key)? {
            documents.push((key.to_string(), text));
        }
    }
    if documents.is_empty() {
        return Err(anyhow!(
            "workspace has no persisted documents to export: {}",
            workspace_path.to_string_lossy()
        ));
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let checksums: serde_json::Map<String, serde_json::Value> = documents
        .iter()
        .map(|(key, text)| {
            (
                data_entry(key),
                serde_json::Value::String(sha256_hex(text.as_bytes())),
            )
        })
        .collect();
    let manifest = serde_json::json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "bundleId": Uuid::new_v4().to_string(),
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "checksums": checksums,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (key, text) in &documents {
        let entry = data_entry(key);
        zip.start_file(entry.as_str(), opts)
            .with_context(|| format!("failed to start entry {entry}"))?;
        zip.write_all(text.as_bytes())
            .with_context(|| format!("failed to write entry {entry}"))?;
    }

    let workspace_meta = serde_json::json!({
        "sourceWorkspace": workspace_path.to_string_lossy(),
    });
    zip.start_file(META_WORKSPACE_ENTRY, opts)
        .context("failed to start workspace metadata entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&workspace_meta)
            .context("failed to serialize workspace metadata")?
            .as_bytes(),
    )
    .context("failed to write workspace metadata entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: documents.len() + 2,
    })
}

/// Validates the manifest format tag and checksums, then installs the data
/// entries into the workspace through the store's atomic writes.
pub fn import_workspace_bundle(
    in_path: &Path,
    store: &LocalStore,
) -> anyhow::Result<ImportSummary> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut installed = Vec::new();
    for key in BUNDLED_KEYS {
        let entry = data_entry(key);
        let mut text = String::new();
        match archive.by_name(&entry) {
            Ok(mut file) => {
                file.read_to_string(&mut text)
                    .with_context(|| format!("failed to read entry {entry}"))?;
            }
            Err(_) => continue,
        }
        if let Some(expected) = manifest
            .get("checksums")
            .and_then(|c| c.get(&entry))
            .and_then(|v| v.as_str())
        {
            let actual = sha256_hex(text.as_bytes());
            if actual != expected {
                return Err(anyhow!("checksum mismatch for {entry}"));
            }
        }
        // Every bundled document must at least parse as JSON before it is
        // allowed to shadow workspace state.
        serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("entry {entry} is not valid JSON"))?;
        store.set(key, &text)?;
        installed.push(key.to_string());
    }

    if installed.is_empty() {
        return Err(anyhow!("bundle contains no data entries"));
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        installed_keys: installed,
    })
}
