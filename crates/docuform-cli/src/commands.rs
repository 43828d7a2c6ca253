//! Command implementations.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use docuform_core::DocuformConfig;
use docuform_docx::{
    DocxPackage, FieldKind, PdfConverter, RenderOptions, SofficeConverter, Template,
    TemplateError, TemplateField, html_to_docx,
};
use docuform_records::{RecordDirectory, StudentRecord};
use serde_json::{Map, Value};

use crate::cli::Command;
use crate::config_handlers::handle_config_command;
use crate::{Error, Result};

// ============================================================================
// Dispatch
// ============================================================================

/// Run `command` against a loaded configuration.
///
/// `config_path` is the raw `--config` value; the `config` subcommands
/// re-resolve it themselves because they edit the file, not the loaded copy.
pub async fn run(config: DocuformConfig, config_path: Option<&str>, command: Command) -> Result<()> {
    match command {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Fields { file, json } => {
            println!("{}", fields(&file, json)?);
            Ok(())
        }
        Command::Render {
            file,
            data,
            set,
            student,
            out,
            pdf,
        } => {
            let written = render(
                &config,
                &file,
                data.as_deref(),
                &set,
                student.as_deref(),
                &out,
                pdf,
            )
            .await?;
            println!("Wrote {} ({written} bytes)", out.display());
            Ok(())
        }
        Command::FromHtml { input, out } => {
            from_html(&input, &out)?;
            println!("Wrote {}", out.display());
            Ok(())
        }
        Command::Student {
            id,
            search,
            limit,
            json,
        } => {
            let directory = RecordDirectory::from_settings(&config.records)?;
            let output = match (id, search) {
                (_, Some(query)) => {
                    let found = directory.search(&query, limit).await?;
                    format_records(&found, &config.records.name_column, json)?
                }
                (Some(id), None) => {
                    let record = directory.lookup(&id).await?;
                    format_record(&record, json)?
                }
                (None, None) => return Err(Error::Usage("give a student id or --search".into())),
            };
            println!("{output}");
            Ok(())
        }
        Command::Config { action } => Ok(handle_config_command(config_path, action)?),
    }
}

// ============================================================================
// serve
// ============================================================================

async fn serve(mut config: DocuformConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    tracing::info!(
        addr = %config.server.bind_addr(),
        storage = config.storage.backend.as_str(),
        "Starting server"
    );
    docuform_api::Server::from_config(&config)?.run().await?;
    tracing::info!("Server stopped");
    Ok(())
}

// ============================================================================
// fields
// ============================================================================

/// Describe the fields of the template at `file`, as a tree or as JSON.
pub fn fields(file: &Path, json: bool) -> Result<String> {
    let template = Template::from_bytes(&read(file)?)?;
    let fields = template.fields();
    if json {
        return Ok(serde_json::to_string_pretty(&fields)?);
    }
    if fields.is_empty() {
        return Ok("(no fields)".to_string());
    }
    let mut out = String::new();
    write_field_tree(&fields, 0, &mut out);
    Ok(out.trim_end().to_string())
}

fn write_field_tree(fields: &[TemplateField], depth: usize, out: &mut String) {
    for field in fields {
        let marker = match field.kind {
            FieldKind::Text => "",
            FieldKind::Section => " [section]",
        };
        out.push_str(&format!(
            "{:indent$}{}  ({}){marker}\n",
            "",
            field.name,
            field.label,
            indent = depth * 2
        ));
        write_field_tree(&field.children, depth + 1, out);
    }
}

// ============================================================================
// render
// ============================================================================

/// Render the template at `file` into `out`, returning the bytes written.
///
/// Values are layered: the student's record first, then the `--data` file,
/// then each `--set`. PDF output is chosen by `pdf` or a `.pdf` extension.
pub async fn render(
    config: &DocuformConfig,
    file: &Path,
    data: Option<&Path>,
    set: &[String],
    student: Option<&str>,
    out: &Path,
    pdf: bool,
) -> Result<usize> {
    let package = DocxPackage::from_bytes(&read(file)?)?;
    let options = RenderOptions {
        linebreaks: config.render.linebreaks,
        ..RenderOptions::default()
    };
    let template = Template::parse(package, &options.delimiters)?;

    let mut values = Map::new();
    if let Some(id) = student {
        let directory = RecordDirectory::from_settings(&config.records)?;
        let names = text_field_names(&template.fields());
        let prefilled = directory
            .prefill(id, names.iter().map(String::as_str))
            .await?;
        tracing::debug!(student = id, filled = prefilled.len(), "Pre-filled from record");
        values.extend(prefilled.into_iter().map(|(k, v)| (k, Value::String(v))));
    }
    if let Some(path) = data {
        let parsed: Value = serde_json::from_slice(&read(path)?)?;
        let Value::Object(object) = parsed else {
            return Err(Error::Usage(format!(
                "{} must contain a JSON object",
                path.display()
            )));
        };
        values.extend(object);
    }
    for assignment in set {
        let (key, value) = parse_set(assignment)?;
        insert_dotted(&mut values, &key, value);
    }

    let rendered = template.render(&Value::Object(values), &options)?.to_bytes()?;
    let bytes = if pdf || has_extension(out, "pdf") {
        converter(config)?.to_pdf(&rendered).await?
    } else {
        rendered
    };

    write(out, &bytes)?;
    tracing::info!(out = %out.display(), bytes = bytes.len(), "Rendered {}", file.display());
    Ok(bytes.len())
}

fn converter(config: &DocuformConfig) -> Result<SofficeConverter> {
    let program = config.render.soffice_path.trim();
    if program.is_empty() {
        return Err(TemplateError::ConverterUnavailable(
            "render.soffice_path is empty; PDF output is disabled".into(),
        )
        .into());
    }
    Ok(SofficeConverter::new(
        program,
        Duration::from_secs(config.render.pdf_timeout_secs),
    ))
}

/// Names of the top-level text fields, the ones a record can fill.
fn text_field_names(fields: &[TemplateField]) -> Vec<String> {
    fields
        .iter()
        .filter(|f| f.kind == FieldKind::Text)
        .map(|f| f.name.clone())
        .collect()
}

/// Split a `key=value` assignment.
///
/// A value starting with `[` or `{` is parsed as JSON so lists can drive
/// sections; anything else is taken as a literal string.
pub fn parse_set(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| Error::Usage(format!("expected KEY=VALUE, got '{assignment}'")))?;
    let key = key.trim();
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(Error::Usage(format!("invalid key in '{assignment}'")));
    }
    let value = if raw.starts_with('[') || raw.starts_with('{') {
        serde_json::from_str(raw)?
    } else {
        Value::String(raw.to_string())
    };
    Ok((key.to_string(), value))
}

/// Insert `value` at a dotted `key`, replacing non-object intermediates.
pub fn insert_dotted(values: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            values.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = values
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert_dotted(inner, rest, value);
            }
        }
    }
}

// ============================================================================
// from-html
// ============================================================================

/// Convert the HTML file at `input` into a DOCX template at `out`.
pub fn from_html(input: &Path, out: &Path) -> Result<()> {
    let html = std::fs::read_to_string(input)
        .map_err(|e| docuform_core::Error::io_with_path(e, input))?;
    let bytes = html_to_docx(&html)?.to_bytes()?;
    write(out, &bytes)
}

// ============================================================================
// student
// ============================================================================

/// Format one record as `column: value` lines, or as JSON.
pub fn format_record(record: &StudentRecord, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(record)?);
    }
    let width = record.fields.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    Ok(record
        .fields
        .iter()
        .map(|(column, value)| format!("{column:<width$}  {value}"))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Format search results as `id  name` lines, or as JSON.
pub fn format_records(records: &[StudentRecord], name_column: &str, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(records)?);
    }
    if records.is_empty() {
        return Ok("(no matches)".to_string());
    }
    Ok(records
        .iter()
        .map(|r| format!("{}  {}", r.id, r.get(name_column).unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n"))
}

// ============================================================================
// File helpers
// ============================================================================

fn read(path: &Path) -> Result<Vec<u8>> {
    Ok(std::fs::read(path).map_err(|e| docuform_core::Error::io_with_path(e, path))?)
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    Ok(std::fs::write(path, bytes).map_err(|e| docuform_core::Error::io_with_path(e, path))?)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
