use crate::core::io::traits::AtomFile;
use crate::core::models::atoms::{AtomSet, AtomSetError};
use crate::core::models::radii::vdw_radius;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzrError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzrParseErrorKind },
    #[error("Atom ids must be given for every atom or for none (line {line})")]
    PartialIds { line: usize },
    #[error("Invalid atom set: {0}")]
    AtomSet(#[from] AtomSetError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XyzrParseErrorKind {
    #[error("Expected at least 4 fields, found {0}")]
    TooFewFields(usize),
    #[error("Invalid coordinate '{0}'")]
    InvalidCoordinate(String),
    #[error("Invalid atom id '{0}'")]
    InvalidId(String),
    #[error("Unexpected trailing field '{0}'")]
    TrailingField(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyzrMetadata {
    /// Element symbol per atom when the radius was looked up from one.
    pub elements: Vec<Option<String>>,
    /// Leading `#` comment lines, without the marker.
    pub header: Vec<String>,
}

/// Whitespace-separated atom records.
///
/// Each record is `x y z r [id]` or `x y z element [id]`; the radius of an element record
/// comes from the van der Waals table. Blank lines and `#` comments are skipped.
pub struct XyzrFile;

impl AtomFile for XyzrFile {
    type Metadata = XyzrMetadata;
    type Error = XyzrError;

    fn read_from(reader: &mut impl BufRead) -> Result<(AtomSet, Self::Metadata), Self::Error> {
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut z = Vec::new();
        let mut r = Vec::new();
        let mut ids: Vec<u32> = Vec::new();
        let mut metadata = XyzrMetadata::default();
        let mut ids_present: Option<bool> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = line_no + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('#') {
                if x.is_empty() {
                    metadata.header.push(comment.trim().to_string());
                }
                continue;
            }

            let parse_err = |kind| XyzrError::Parse {
                line: line_no,
                kind,
            };
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(parse_err(XyzrParseErrorKind::TooFewFields(fields.len())));
            }
            if fields.len() > 5 {
                return Err(parse_err(XyzrParseErrorKind::TrailingField(
                    fields[5].to_string(),
                )));
            }

            let mut coords = [0.0f32; 3];
            for (c, field) in coords.iter_mut().zip(&fields[..3]) {
                *c = field
                    .parse()
                    .map_err(|_| parse_err(XyzrParseErrorKind::InvalidCoordinate(field.to_string())))?;
            }

            let (radius, element) = match fields[3].parse::<f32>() {
                Ok(radius) => (radius, None),
                Err(_) => (vdw_radius(fields[3]), Some(fields[3].to_string())),
            };

            let has_id = fields.len() == 5;
            match ids_present {
                None => ids_present = Some(has_id),
                Some(expected) if expected != has_id => {
                    return Err(XyzrError::PartialIds { line: line_no });
                }
                Some(_) => {}
            }
            if has_id {
                let id = fields[4]
                    .parse()
                    .map_err(|_| parse_err(XyzrParseErrorKind::InvalidId(fields[4].to_string())))?;
                ids.push(id);
            }

            x.push(coords[0]);
            y.push(coords[1]);
            z.push(coords[2]);
            r.push(radius);
            metadata.elements.push(element);
        }

        let index = ids_present.unwrap_or(false).then_some(ids);
        let atoms = AtomSet::new(x, y, z, r, index)?;
        Ok((atoms, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(text: &str) -> Result<(AtomSet, XyzrMetadata), XyzrError> {
        XyzrFile::read_from(&mut Cursor::new(text))
    }

    #[test]
    fn reads_radius_records() {
        let (atoms, metadata) = read("# two atoms\n0 0 0 1.5\n\n1.0 2.0 3.0 2.0\n").unwrap();
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms.radii(), &[1.5, 2.0]);
        assert_eq!(atoms.z(), &[0.0, 3.0]);
        assert_eq!(atoms.indices(), &[0, 1]);
        assert_eq!(metadata.header, vec!["two atoms".to_string()]);
        assert_eq!(metadata.elements, vec![None, None]);
    }

    #[test]
    fn reads_element_records_with_ids() {
        let (atoms, metadata) = read("0 0 0 C 10\n1 1 1 o 11\n").unwrap();
        assert_eq!(atoms.radii(), &[1.7, 1.52]);
        assert_eq!(atoms.indices(), &[10, 11]);
        assert_eq!(metadata.elements[1].as_deref(), Some("o"));
    }

    #[test]
    fn rejects_short_records() {
        let err = read("0 0 1.5\n").unwrap_err();
        assert!(matches!(
            err,
            XyzrError::Parse {
                line: 1,
                kind: XyzrParseErrorKind::TooFewFields(3)
            }
        ));
    }

    #[test]
    fn rejects_bad_coordinates() {
        let err = read("0 0 0 1\n0 zz 0 1\n").unwrap_err();
        assert!(matches!(
            err,
            XyzrError::Parse {
                line: 2,
                kind: XyzrParseErrorKind::InvalidCoordinate(_)
            }
        ));
    }

    #[test]
    fn rejects_ids_on_only_some_records() {
        let err = read("0 0 0 1 5\n1 1 1 1\n").unwrap_err();
        assert!(matches!(err, XyzrError::PartialIds { line: 2 }));
    }

    #[test]
    fn empty_input_gives_empty_set() {
        let (atoms, _) = read("# nothing here\n").unwrap();
        assert!(atoms.is_empty());
    }

    #[test]
    fn reads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atoms.xyzr");
        std::fs::write(&path, "# two atoms\n0 0 0 1.5\n1 2 3 C\n").unwrap();

        let (atoms, metadata) = XyzrFile::read_from_path(&path).unwrap();
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms.radius(1), 1.7);
        assert_eq!(metadata.header, vec!["two atoms".to_string()]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = XyzrFile::read_from_path(dir.path().join("missing.xyzr"));
        assert!(matches!(result, Err(XyzrError::Io(_))));
    }
}
