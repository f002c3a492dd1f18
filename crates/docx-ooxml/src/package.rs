//! The OOXML package: a ZIP (OPC) container of XML parts.
//!
//! Only `word/document.xml` (the main document part) is parsed into an
//! [`Arena`] for structural reading/rewriting. Every other part — styles,
//! numbering, media, relationships, content types — is held as raw bytes
//! and re-emitted unchanged, per §3 ("other parts...pass through
//! unchanged").

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::arena::Arena;
use crate::error::{OoxmlError, Result};

const DEFAULT_MAIN_PART: &str = "word/document.xml";
const RELATIONSHIP_TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// An in-memory OOXML package: the parsed main document tree plus every
/// other ZIP entry kept as an opaque byte blob.
pub struct Package {
    /// Every non-main part, keyed by its ZIP entry name (e.g.
    /// `"word/styles.xml"`, `"[Content_Types].xml"`).
    pub parts: HashMap<String, Vec<u8>>,
    /// The ZIP entry name of the main document part.
    pub main_part_name: String,
    /// The parsed `word/document.xml` tree.
    pub document: Arena,
}

impl Package {
    /// Read a `.docx` byte buffer into a `Package`. Fails with
    /// `MalformedPackage` when the archive or its main part cannot be
    /// parsed (§4.2 contract).
    pub fn read(bytes: &[u8]) -> Result<Package> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|_| OoxmlError::MalformedPackage("<archive>".to_string()))?;

        let mut parts: HashMap<String, Vec<u8>> = HashMap::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            parts.insert(name, buf);
        }

        let main_part_name = Self::resolve_main_part(&parts).unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());

        let main_bytes = parts
            .remove(&main_part_name)
            .ok_or_else(|| OoxmlError::MalformedPackage(main_part_name.clone()))?;
        let document = Arena::parse(&main_bytes)?;

        Ok(Package {
            parts,
            main_part_name,
            document,
        })
    }

    /// Find the main document part via `_rels/.rels`'s `officeDocument`
    /// relationship, falling back to the conventional default name when the
    /// relationships part is absent or unparseable.
    fn resolve_main_part(parts: &HashMap<String, Vec<u8>>) -> Option<String> {
        let rels_bytes = parts.get("_rels/.rels")?;
        let rels_arena = Arena::parse(rels_bytes).ok()?;
        let root = rels_arena.root?;
        for rel in rels_arena.find_children(root, "Relationship") {
            if rels_arena.attr(rel, "Type") == Some(RELATIONSHIP_TYPE_OFFICE_DOCUMENT) {
                let target = rels_arena.attr(rel, "Target")?;
                return Some(target.trim_start_matches('/').to_string());
            }
        }
        None
    }

    /// Serialize back to a complete `.docx` ZIP byte buffer: the rewritten
    /// main part plus every passthrough part, unchanged.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let main_bytes = self.document.to_xml_bytes()?;
        writer
            .start_file(&self.main_part_name, options)
            .map_err(OoxmlError::Zip)?;
        writer.write_all(&main_bytes)?;

        for (name, bytes) in &self.parts {
            writer.start_file(name, options).map_err(OoxmlError::Zip)?;
            writer.write_all(bytes)?;
        }

        let cursor = writer.finish().map_err(OoxmlError::Zip)?;
        Ok(cursor.into_inner())
    }
}
