//! `.nupkg` reader
//!
//! A nupkg is a zip archive with a `<id>.nuspec` XML manifest at its root.
//! Supported frameworks come from `lib/<tfm>/` and `ref/<tfm>/` folders plus
//! the `targetFramework` attributes of dependency and framework-assembly groups.

use super::ArchiveReader;
use crate::error::{FeedError, FeedResult};
use crate::package::{PackageId, PackageIdentity, PackageManifest, PackageVersion, TargetFramework};
use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

/// Reads nuspec manifests out of nupkg archives
#[derive(Debug, Default, Clone, Copy)]
pub struct NupkgReader;

impl ArchiveReader for NupkgReader {
    fn read_manifest(&self, origin: &Path, bytes: &[u8]) -> FeedResult<PackageManifest> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| FeedError::corrupt(origin, e))?;

        let entry_names: Vec<String> = archive.file_names().map(str::to_string).collect();

        let nuspec_name = entry_names
            .iter()
            .find(|name| !name.contains('/') && name.to_ascii_lowercase().ends_with(".nuspec"))
            .cloned()
            .ok_or_else(|| FeedError::corrupt(origin, "no .nuspec manifest at archive root"))?;

        let mut nuspec = String::new();
        archive
            .by_name(&nuspec_name)
            .map_err(|e| FeedError::corrupt(origin, e))?
            .read_to_string(&mut nuspec)
            .map_err(|e| FeedError::corrupt(origin, format!("reading {}: {}", nuspec_name, e)))?;

        let mut manifest = parse_nuspec(origin, &nuspec)?;

        let mut frameworks = folder_frameworks(&entry_names);
        if let Some(declared) = manifest.supported_frameworks.take() {
            frameworks.get_or_insert_with(BTreeSet::new).extend(declared);
        }
        manifest.supported_frameworks = frameworks;

        debug!(
            "Read manifest {} from {}",
            manifest.identity,
            origin.display()
        );
        Ok(manifest)
    }
}

/// Parse nuspec XML. Framework data found here is returned in
/// `supported_frameworks` for the caller to merge with folder data.
pub fn parse_nuspec(origin: &Path, xml: &str) -> FeedResult<PackageManifest> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| FeedError::corrupt(origin, format!("invalid nuspec XML: {}", e)))?;

    let package = doc.root_element();
    if package.tag_name().name() != "package" {
        return Err(FeedError::corrupt(
            origin,
            format!("unexpected nuspec root element <{}>", package.tag_name().name()),
        ));
    }
    let metadata = child_element(&package, "metadata")
        .ok_or_else(|| FeedError::corrupt(origin, "nuspec has no <metadata> element"))?;

    let id = child_text(&metadata, "id")
        .ok_or_else(|| FeedError::corrupt(origin, "nuspec has no <id>"))?;
    let version = child_text(&metadata, "version")
        .ok_or_else(|| FeedError::corrupt(origin, "nuspec has no <version>"))?;

    let identity = PackageIdentity::new(
        PackageId::new(id).map_err(|e| FeedError::corrupt(origin, e))?,
        PackageVersion::parse(&version).map_err(|e| FeedError::corrupt(origin, e))?,
    );

    let mut manifest = PackageManifest::new(identity);
    manifest.title = child_text(&metadata, "title");
    manifest.description = child_text(&metadata, "description");
    manifest.summary = child_text(&metadata, "summary");
    manifest.authors = child_text(&metadata, "authors")
        .map(|a| {
            a.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    manifest.tags = child_text(&metadata, "tags")
        .map(|t| {
            t.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let declared: BTreeSet<TargetFramework> = metadata
        .descendants()
        .filter(|n| {
            n.is_element()
                && matches!(
                    n.tag_name().name(),
                    "group" | "frameworkAssembly" | "frameworkReference"
                )
        })
        .filter_map(|n| n.attribute("targetFramework"))
        .flat_map(|attr| attr.split(','))
        .filter_map(TargetFramework::parse)
        .collect();
    if !declared.is_empty() {
        manifest.supported_frameworks = Some(declared);
    }

    Ok(manifest)
}

/// Frameworks implied by `lib/` and `ref/` folder layout
fn folder_frameworks(entry_names: &[String]) -> Option<BTreeSet<TargetFramework>> {
    let mut frameworks = BTreeSet::new();
    let mut saw_assets = false;

    for name in entry_names {
        let mut parts = name.split('/');
        let root = parts.next().unwrap_or_default().to_ascii_lowercase();
        if root != "lib" && root != "ref" {
            continue;
        }
        let (Some(folder), Some(_file)) = (parts.next(), parts.next()) else {
            // lib/Foo.dll: assets without a framework folder
            if name.matches('/').count() == 1 && !name.ends_with('/') {
                saw_assets = true;
                frameworks.insert(TargetFramework::any());
            }
            continue;
        };
        saw_assets = true;
        if let Some(framework) = TargetFramework::parse(folder) {
            frameworks.insert(framework);
        }
    }

    saw_assets.then_some(frameworks)
}

fn child_element<'a>(
    node: &'a roxmltree::Node<'a, 'a>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
