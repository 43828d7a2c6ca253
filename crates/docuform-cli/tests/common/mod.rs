//! Shared fixtures: a scratch directory with a template and a roster.

use std::path::PathBuf;

use docuform_core::DocuformConfig;
use docuform_docx::{DOCUMENT_PART, DocxPackage, html_to_docx};
use tempfile::TempDir;

pub const LETTER_HTML: &str = "<p>Dear {guardian_name},</p>\
    <p>{student_name} is enrolled in grade {grade}.</p>\
    <p>{#courses}{title}; {/courses}</p>";

pub const ROSTER_CSV: &str = "Student ID,Student Name,Grade,Guardian\n\
    1001,Ana Lima,10,Rosa Lima\n\
    1002,Bo Chen,11,Wei Chen\n";

pub struct Workspace {
    pub dir: TempDir,
    pub template: PathBuf,
    pub config: DocuformConfig,
}

impl Workspace {
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// `Letter.docx` and `roster.csv` in a temp dir, with records and PDF
/// output configured for them.
pub fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("Letter.docx");
    std::fs::write(&template, html_to_docx(LETTER_HTML).unwrap().to_bytes().unwrap()).unwrap();
    let roster = dir.path().join("roster.csv");
    std::fs::write(&roster, ROSTER_CSV).unwrap();

    let mut config = DocuformConfig::default();
    config.records.path = Some(roster);
    config.records.name_column = "Student Name".into();
    config
        .records
        .field_map
        .insert("guardian_name".into(), "Guardian".into());
    config.render.soffice_path = String::new();

    Workspace {
        dir,
        template,
        config,
    }
}

pub fn document_xml(path: &std::path::Path) -> String {
    DocxPackage::from_bytes(&std::fs::read(path).unwrap())
        .unwrap()
        .part(DOCUMENT_PART)
        .unwrap()
        .to_string()
}
