//! Test fixtures: in-memory nupkg archives

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Builds minimal nupkg archives for tests
pub struct NupkgBuilder {
    id: String,
    version: String,
    description: Option<String>,
    tags: Option<String>,
    libs: Vec<String>,
    groups: Vec<String>,
    nuspec: bool,
}

impl NupkgBuilder {
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            description: None,
            tags: None,
            libs: Vec::new(),
            groups: Vec::new(),
            nuspec: true,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn tags(mut self, tags: &str) -> Self {
        self.tags = Some(tags.to_string());
        self
    }

    pub fn lib(mut self, framework: &str) -> Self {
        self.libs.push(framework.to_string());
        self
    }

    pub fn dependency_group(mut self, framework: &str) -> Self {
        self.groups.push(framework.to_string());
        self
    }

    pub fn without_nuspec(mut self) -> Self {
        self.nuspec = false;
        self
    }

    pub fn nuspec_xml(&self) -> String {
        let mut metadata = format!(
            "<id>{}</id><version>{}</version><authors>pkgfeed tests</authors>",
            self.id, self.version
        );
        if let Some(ref description) = self.description {
            metadata.push_str(&format!("<description>{}</description>", description));
        }
        if let Some(ref tags) = self.tags {
            metadata.push_str(&format!("<tags>{}</tags>", tags));
        }
        if !self.groups.is_empty() {
            metadata.push_str("<dependencies>");
            for group in &self.groups {
                metadata.push_str(&format!(r#"<group targetFramework="{}" />"#, group));
            }
            metadata.push_str("</dependencies>");
        }
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?><package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd"><metadata>{}</metadata></package>"#,
            metadata
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        if self.nuspec {
            zip.start_file(format!("{}.nuspec", self.id), options).unwrap();
            zip.write_all(self.nuspec_xml().as_bytes()).unwrap();
        }
        for lib in &self.libs {
            zip.start_file(format!("lib/{}/{}.dll", lib, self.id), options)
                .unwrap();
            zip.write_all(b"MZ").unwrap();
        }
        zip.start_file("content/readme.txt", options).unwrap();
        zip.write_all(format!("{} {}", self.id, self.version).as_bytes())
            .unwrap();

        zip.finish().unwrap().into_inner()
    }

    /// Write the archive as `<id>.<version>.nupkg` under `dir`
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        self.write_as(dir, &format!("{}.{}.nupkg", self.id, self.version))
    }

    /// Write the archive under `dir` with an arbitrary file name
    pub fn write_as(&self, dir: &Path, file_name: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}
